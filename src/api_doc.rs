use utoipa::OpenApi;

use crate::error::{ErrorResponse, HealthResponse, UnhealthyResponse};
use crate::handlers;
use crate::models::{MessageResponse, TriageKey, TriageListResponse};

/// OpenAPI documentation of the patient service
#[derive(OpenApi)]
#[openapi(
    info(
        title = "pacientes API",
        version = "1.0.0",
        description = "Patient records keyed by national ID"
    ),
    paths(
        handlers::health::patient_health_handler,
        handlers::pacientes::create_patient_handler,
        handlers::pacientes::get_patient_handler,
        handlers::pacientes::update_patient_handler,
        handlers::pacientes::delete_patient_handler
    ),
    components(
        schemas(
            MessageResponse,
            ErrorResponse,
            HealthResponse,
            UnhealthyResponse
        )
    ),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "pacientes", description = "Patient record operations")
    )
)]
pub struct PatientApiDoc;

/// OpenAPI documentation of the triage service
#[derive(OpenApi)]
#[openapi(
    info(
        title = "triajes API",
        version = "1.0.0",
        description = "Vital-sign records keyed by national ID and timestamp"
    ),
    paths(
        handlers::health::triage_health_handler,
        handlers::triajes::create_triage_handler,
        handlers::triajes::list_triage_handler,
        handlers::triajes::get_triage_handler
    ),
    components(
        schemas(
            TriageKey,
            TriageListResponse,
            ErrorResponse,
            HealthResponse,
            UnhealthyResponse
        )
    ),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "triajes", description = "Triage record operations")
    )
)]
pub struct TriageApiDoc;
