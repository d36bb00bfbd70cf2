use crate::error::{ApiError, ErrorResponse};
use crate::models::{MessageResponse, Record, PATIENT_REQUIRED_FIELDS};
use crate::routes;
use crate::state::PatientState;
use crate::store::StoreError;
use crate::validation::{key_field, parse_body, path_params, require_fields, require_param};
use axum::extract::{rejection::PathRejection, Path, State};
use axum::{body::Bytes, http::StatusCode, Json};

const DNI_REQUIRED: &str = "DNI requerido.";
const PATIENT_NOT_FOUND: &str = "Paciente no encontrado.";

/// POST /pacientes handler - Register a patient
///
/// Stores the payload verbatim, extra fields included. The `dni` must not be
/// registered yet.
#[utoipa::path(
    post,
    path = routes::PACIENTES,
    request_body = serde_json::Value,
    responses(
        (status = 201, description = "Patient created", body = serde_json::Value),
        (status = 400, description = "Missing required fields", body = ErrorResponse),
        (status = 409, description = "Patient already registered", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "pacientes"
)]
pub async fn create_patient_handler(
    State(state): State<PatientState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    let payload = parse_body(&body);
    require_fields(&payload, PATIENT_REQUIRED_FIELDS)?;
    let dni = key_field(&payload, "dni")?;

    match state.store.create(&dni, &payload).await {
        Ok(()) => {
            tracing::info!("Registered patient with dni: {}", dni);
            Ok((StatusCode::CREATED, Json(payload)))
        }
        Err(StoreError::ConditionFailed) => {
            tracing::info!("Patient already registered with dni: {}", dni);
            Err(ApiError::Conflict("Paciente ya registrado.".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /pacientes/{dni} handler - Retrieve a patient
#[utoipa::path(
    get,
    path = routes::PACIENTE,
    params(
        ("dni" = String, Path, description = "National ID of the patient")
    ),
    responses(
        (status = 200, description = "Patient found", body = serde_json::Value),
        (status = 400, description = "Missing dni", body = ErrorResponse),
        (status = 404, description = "Patient not found", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "pacientes"
)]
pub async fn get_patient_handler(
    State(state): State<PatientState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    let dni = path_params(path, DNI_REQUIRED)?;
    let dni = require_param(Some(dni.as_str()), DNI_REQUIRED)?;

    match state.store.get(&dni).await? {
        Some(record) => {
            tracing::info!("Retrieved patient with dni: {}", dni);
            Ok((StatusCode::OK, Json(record)))
        }
        None => {
            tracing::info!("Patient not found with dni: {}", dni);
            Err(ApiError::NotFound(PATIENT_NOT_FOUND.to_string()))
        }
    }
}

/// PUT /pacientes/{dni} handler - Partially update a patient
///
/// Only the supplied fields are overwritten. A `dni` in the body is ignored,
/// the primary key never changes.
#[utoipa::path(
    put,
    path = routes::PACIENTE,
    params(
        ("dni" = String, Path, description = "National ID of the patient")
    ),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Patient updated", body = serde_json::Value),
        (status = 400, description = "Missing dni or nothing to update", body = ErrorResponse),
        (status = 404, description = "Patient not found", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "pacientes"
)]
pub async fn update_patient_handler(
    State(state): State<PatientState>,
    path: Result<Path<String>, PathRejection>,
    body: Bytes,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    let dni = path_params(path, DNI_REQUIRED)?;
    let dni = require_param(Some(dni.as_str()), DNI_REQUIRED)?;

    let mut changes = parse_body(&body);
    if changes.is_empty() {
        return Err(ApiError::Validation(
            "Datos requeridos para actualizar.".to_string(),
        ));
    }
    changes.remove("dni");
    if changes.is_empty() {
        return Err(ApiError::Validation(
            "No hay campos para actualizar.".to_string(),
        ));
    }

    match state.store.update(&dni, &changes).await {
        Ok(record) => {
            tracing::info!("Updated {} fields of patient with dni: {}", changes.len(), dni);
            Ok((StatusCode::OK, Json(record)))
        }
        Err(StoreError::ConditionFailed) => {
            tracing::info!("Update of missing patient with dni: {}", dni);
            Err(ApiError::NotFound(PATIENT_NOT_FOUND.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// DELETE /pacientes/{dni} handler - Remove a patient
///
/// Refused while the triage service still holds records for the patient.
#[utoipa::path(
    delete,
    path = routes::PACIENTE,
    params(
        ("dni" = String, Path, description = "National ID of the patient")
    ),
    responses(
        (status = 200, description = "Patient deleted", body = MessageResponse),
        (status = 400, description = "Missing dni", body = ErrorResponse),
        (status = 404, description = "Patient not found", body = ErrorResponse),
        (status = 409, description = "Patient has triage records", body = ErrorResponse),
        (status = 500, description = "Lookup not configured or store error", body = ErrorResponse),
        (status = 502, description = "Triage lookup failed", body = ErrorResponse)
    ),
    tag = "pacientes"
)]
pub async fn delete_patient_handler(
    State(state): State<PatientState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let dni = path_params(path, DNI_REQUIRED)?;
    let dni = require_param(Some(dni.as_str()), DNI_REQUIRED)?;

    let Some(triage_lookup) = state.triage_lookup.as_ref() else {
        tracing::error!("Refusing to delete patient {}: TRIAJES_API_BASE is not configured", dni);
        return Err(ApiError::Configuration(
            "Configura TRIAJES_API_BASE para validar triajes antes de eliminar.".to_string(),
        ));
    };

    let triage_records = triage_lookup.list_triage_records(&dni).await.map_err(|e| {
        tracing::warn!("Triage lookup for dni {} failed: {}", dni, e);
        ApiError::Upstream("No se pudo validar triajes.".to_string())
    })?;

    if !triage_records.is_empty() {
        tracing::info!(
            "Patient {} has {} triage records, not deleting",
            dni,
            triage_records.len()
        );
        return Err(ApiError::Conflict(
            "Paciente tiene triajes registrados.".to_string(),
        ));
    }

    match state.store.delete(&dni).await {
        Ok(()) => {
            tracing::info!("Deleted patient with dni: {}", dni);
            Ok((
                StatusCode::OK,
                Json(MessageResponse {
                    message: "Paciente eliminado.".to_string(),
                }),
            ))
        }
        Err(StoreError::ConditionFailed) => {
            tracing::info!("Delete of missing patient with dni: {}", dni);
            Err(ApiError::NotFound(PATIENT_NOT_FOUND.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}
