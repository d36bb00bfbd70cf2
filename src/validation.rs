//! Request payload checks shared by both services.

use axum::body::Bytes;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use serde_json::Value as JsonValue;

use crate::error::ApiError;
use crate::models::Record;

/// Parse a request body into a record.
///
/// An empty body, malformed JSON, or anything other than a JSON object yields
/// an empty record so the caller reports it as missing data.
pub fn parse_body(body: &Bytes) -> Record {
    if body.is_empty() {
        return Record::new();
    }
    match serde_json::from_slice::<JsonValue>(body) {
        Ok(JsonValue::Object(record)) => record,
        Ok(_) | Err(_) => Record::new(),
    }
}

/// JSON falsiness: absent values and empty/zero/false values count as missing.
fn is_blank(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => true,
        Some(JsonValue::Bool(flag)) => !flag,
        Some(JsonValue::Number(number)) => number.as_f64() == Some(0.0),
        Some(JsonValue::String(text)) => text.is_empty(),
        Some(JsonValue::Array(items)) => items.is_empty(),
        Some(JsonValue::Object(fields)) => fields.is_empty(),
    }
}

/// Names of the required fields that are missing or blank, in declaration order.
pub fn missing_fields<'a>(payload: &Record, required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|field| is_blank(payload.get(*field)))
        .collect()
}

pub fn require_fields(payload: &Record, required: &[&str]) -> Result<(), ApiError> {
    let missing = missing_fields(payload, required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "Faltan campos requeridos: {}",
            missing.join(", ")
        )))
    }
}

/// Read a key attribute that has already passed `require_fields`.
pub fn key_field(payload: &Record, field: &str) -> Result<String, ApiError> {
    match payload.get(field) {
        Some(JsonValue::String(value)) => Ok(value.clone()),
        _ => Err(ApiError::Validation(format!("El campo {} debe ser texto.", field))),
    }
}

/// A path or query parameter that must be present and non-blank.
pub fn require_param(value: Option<&str>, message: &str) -> Result<String, ApiError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value.to_string()),
        _ => Err(ApiError::Validation(message.to_string())),
    }
}

/// Unwrap path parameters; a segment the extractor rejects (bad
/// percent-encoding, invalid UTF-8) becomes a validation error.
pub fn path_params<T>(path: Result<Path<T>, PathRejection>, message: &str) -> Result<T, ApiError> {
    match path {
        Ok(Path(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!("Rejected path parameters: {}", rejection);
            Err(ApiError::Validation(message.to_string()))
        }
    }
}

/// Unwrap a query string, e.g. a repeated `dni`, into a validation error when rejected.
pub fn query_params<T>(
    query: Result<Query<T>, QueryRejection>,
    message: &str,
) -> Result<T, ApiError> {
    match query {
        Ok(Query(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!("Rejected query string: {}", rejection);
            Err(ApiError::Validation(message.to_string()))
        }
    }
}
