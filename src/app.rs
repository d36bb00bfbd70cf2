//! Router assembly and the HTTP server loop shared by both binaries.

use axum::{http::StatusCode, routing::get, routing::post, Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api_doc::{PatientApiDoc, TriageApiDoc};
use crate::config::Config;
use crate::error::ErrorResponse;
use crate::handlers;
use crate::routes;
use crate::state::{PatientState, TriageState};

/// Routes of the patient service
pub fn patient_router(state: PatientState) -> Router {
    let api = Router::new()
        .route(routes::HEALTH, get(handlers::patient_health_handler))
        .route(routes::PACIENTES, post(handlers::create_patient_handler))
        .route(
            routes::PACIENTE,
            get(handlers::get_patient_handler)
                .put(handlers::update_patient_handler)
                .delete(handlers::delete_patient_handler),
        )
        .with_state(state);

    let docs = SwaggerUi::new(routes::SWAGGER_UI)
        .url(routes::OPENAPI_JSON, PatientApiDoc::openapi());
    finish(api, docs)
}

/// Routes of the triage service
pub fn triage_router(state: TriageState) -> Router {
    let api = Router::new()
        .route(routes::HEALTH, get(handlers::triage_health_handler))
        .route(
            routes::TRIAJES,
            get(handlers::list_triage_handler).post(handlers::create_triage_handler),
        )
        .route(routes::TRIAJE, get(handlers::get_triage_handler))
        .with_state(state);

    let docs = SwaggerUi::new(routes::SWAGGER_UI)
        .url(routes::OPENAPI_JSON, TriageApiDoc::openapi());
    finish(api, docs)
}

/// Shared layers: JSON 404 and 405 bodies, any-origin CORS, request tracing.
fn finish(api: Router, docs: SwaggerUi) -> Router {
    api.merge(docs)
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(route_not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn route_not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            message: "Ruta no encontrada.".to_string(),
        }),
    )
}

async fn method_not_allowed() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse {
            message: "Método no permitido.".to_string(),
        }),
    )
}

/// Bind the configured address and serve `router` until Ctrl-C.
pub async fn serve(router: Router, config: &Config) -> anyhow::Result<()> {
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
