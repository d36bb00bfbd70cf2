use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Error response type
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

/// Response type for health check endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Response type for unhealthy status
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UnhealthyResponse {
    pub status: String,
    pub error: String,
}

/// Custom error type for API endpoints
///
/// Every handler returns this on its failure paths. Each variant maps to one
/// HTTP status and renders as `{"message": ...}`.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed input
    Validation(String),
    /// Duplicate create, or delete blocked by dependent records
    Conflict(String),
    /// No matching record
    NotFound(String),
    /// Deployment configuration needed by this operation is absent
    Configuration(String),
    /// A dependent service was unreachable or answered with unusable data
    Upstream(String),
    /// Unexpected store failure
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Validation(message)
            | ApiError::Conflict(message)
            | ApiError::NotFound(message)
            | ApiError::Configuration(message)
            | ApiError::Upstream(message)
            | ApiError::Internal(message) => message,
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Store operation failed: {}", err);
        ApiError::Internal("Error interno del servidor.".to_string())
    }
}
