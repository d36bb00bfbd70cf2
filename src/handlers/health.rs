use crate::error::{HealthResponse, UnhealthyResponse};
use crate::routes;
use crate::state::{PatientState, TriageState};
use crate::store::StoreResult;
use axum::{extract::State, http::StatusCode, Json};

type HealthResult =
    Result<(StatusCode, Json<HealthResponse>), (StatusCode, Json<UnhealthyResponse>)>;

fn health_response(probe: StoreResult<()>) -> HealthResult {
    match probe {
        Ok(()) => {
            tracing::debug!("Health check passed");
            Ok((
                StatusCode::OK,
                Json(HealthResponse {
                    status: "healthy".to_string(),
                }),
            ))
        }
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(UnhealthyResponse {
                    status: "unhealthy".to_string(),
                    error: format!("Cannot connect to database: {}", e),
                }),
            ))
        }
    }
}

/// GET /health handler of the patient service
///
/// Returns 200 OK if the patient store answers a probe, 503 otherwise.
#[utoipa::path(
    get,
    path = routes::HEALTH,
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = UnhealthyResponse)
    ),
    tag = "health"
)]
pub async fn patient_health_handler(State(state): State<PatientState>) -> HealthResult {
    health_response(state.store.health_check().await)
}

/// GET /health handler of the triage service
#[utoipa::path(
    get,
    path = routes::HEALTH,
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = UnhealthyResponse)
    ),
    tag = "health"
)]
pub async fn triage_health_handler(State(state): State<TriageState>) -> HealthResult {
    health_response(state.store.health_check().await)
}
