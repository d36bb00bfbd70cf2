use crate::error::{ApiError, ErrorResponse};
use crate::models::{
    Record, TriageKey, TriageListQuery, TriageListResponse, TRIAGE_REQUIRED_FIELDS,
};
use crate::routes;
use crate::state::TriageState;
use crate::validation::{
    key_field, parse_body, path_params, query_params, require_fields, require_param,
};
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::{body::Bytes, http::StatusCode, Json};

/// POST /triajes handler - Record a set of vital signs
///
/// A record for an existing (dni, fechaHora) pair is overwritten.
#[utoipa::path(
    post,
    path = routes::TRIAJES,
    request_body = serde_json::Value,
    responses(
        (status = 201, description = "Triage record stored", body = serde_json::Value),
        (status = 400, description = "Missing required fields", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "triajes"
)]
pub async fn create_triage_handler(
    State(state): State<TriageState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    let payload = parse_body(&body);
    require_fields(&payload, TRIAGE_REQUIRED_FIELDS)?;
    let key = TriageKey::new(key_field(&payload, "dni")?, key_field(&payload, "fechaHora")?);

    state.store.put(&key, &payload).await?;

    tracing::info!("Stored triage record for dni {} at {}", key.dni, key.fecha_hora);
    Ok((StatusCode::CREATED, Json(payload)))
}

/// GET /triajes?dni= handler - List the triage records of a patient
///
/// Returns only the keys of each record, ordered by `fechaHora`.
#[utoipa::path(
    get,
    path = routes::TRIAJES,
    params(TriageListQuery),
    responses(
        (status = 200, description = "Triage record keys", body = TriageListResponse),
        (status = 400, description = "Missing dni", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "triajes"
)]
pub async fn list_triage_handler(
    State(state): State<TriageState>,
    query: Result<Query<TriageListQuery>, QueryRejection>,
) -> Result<(StatusCode, Json<TriageListResponse>), ApiError> {
    const DNI_REQUIRED: &str = "DNI requerido.";
    let query = query_params(query, DNI_REQUIRED)?;
    let dni = require_param(query.dni.as_deref(), DNI_REQUIRED)?;

    let items = state.store.list_keys(&dni).await?;

    tracing::info!("Listed {} triage records for dni: {}", items.len(), dni);
    Ok((StatusCode::OK, Json(TriageListResponse { items })))
}

/// GET /triajes/{dni}/{fechaHora} handler - Retrieve one triage record
///
/// `fechaHora` is percent-decoded by the path extractor, so
/// `2024-01-01T10%3A00%3A00` looks up `2024-01-01T10:00:00`.
#[utoipa::path(
    get,
    path = routes::TRIAJE,
    params(
        ("dni" = String, Path, description = "National ID of the patient"),
        ("fechaHora" = String, Path, description = "URL-encoded timestamp of the measurement")
    ),
    responses(
        (status = 200, description = "Triage record found", body = serde_json::Value),
        (status = 400, description = "Missing dni or fechaHora", body = ErrorResponse),
        (status = 404, description = "Triage record not found", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "triajes"
)]
pub async fn get_triage_handler(
    State(state): State<TriageState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    const KEY_REQUIRED: &str = "DNI y fechaHora requeridos.";
    let (dni, fecha_hora) = path_params(path, KEY_REQUIRED)?;
    let key = TriageKey::new(
        require_param(Some(dni.as_str()), KEY_REQUIRED)?,
        require_param(Some(fecha_hora.as_str()), KEY_REQUIRED)?,
    );

    let found = state.store.get(&key).await.map_err(|e| {
        tracing::error!("Failed to read triage record {:?}: {}", key, e);
        ApiError::Internal("Error al consultar triaje.".to_string())
    })?;

    match found {
        Some(record) => {
            tracing::info!("Retrieved triage record for dni {} at {}", key.dni, key.fecha_hora);
            Ok((StatusCode::OK, Json(record)))
        }
        None => {
            tracing::info!("Triage record not found for dni {} at {}", key.dni, key.fecha_hora);
            Err(ApiError::NotFound("Triaje no encontrado.".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryTriageStore, StoreResult, TriageStore};
    use async_trait::async_trait;
    use axum::{body::Body, http::Request, routing::get, Router};
    use serde_json::{json, Value as JsonValue};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct BrokenStore;

    #[async_trait]
    impl TriageStore for BrokenStore {
        async fn put(&self, _: &TriageKey, _: &Record) -> StoreResult<()> {
            Err(anyhow::anyhow!("store offline").into())
        }
        async fn list_keys(&self, _: &str) -> StoreResult<Vec<TriageKey>> {
            Err(anyhow::anyhow!("store offline").into())
        }
        async fn get(&self, _: &TriageKey) -> StoreResult<Option<Record>> {
            Err(anyhow::anyhow!("store offline").into())
        }
        async fn health_check(&self) -> StoreResult<()> {
            Err(anyhow::anyhow!("store offline").into())
        }
    }

    fn router(store: Arc<dyn TriageStore>) -> Router {
        Router::new()
            .route(routes::TRIAJES, get(list_triage_handler).post(create_triage_handler))
            .route(routes::TRIAJE, get(get_triage_handler))
            .with_state(TriageState { store })
    }

    fn setup_test_app() -> Router {
        router(Arc::new(MemoryTriageStore::default()))
    }

    fn triage(dni: &str, fecha_hora: &str) -> JsonValue {
        json!({
            "dni": dni,
            "fechaHora": fecha_hora,
            "presionArterial": "120/80",
            "frecuenciaCardiaca": "72",
            "saturacionOxigeno": "98",
            "temperaturaCorporal": "36.5",
            "pesoKg": "70",
            "tallaM": "1.75"
        })
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<JsonValue>,
    ) -> (StatusCode, JsonValue) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_create_returns_payload() {
        let app = setup_test_app();
        let input = triage("12345678", "2024-01-01T10:00:00");

        let (status, body) = send(&app, "POST", "/triajes", Some(input.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, input);
    }

    #[tokio::test]
    async fn test_create_lists_every_missing_field() {
        let app = setup_test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/triajes",
            Some(json!({"dni": "12345678", "pesoKg": "70", "observaciones": "tos"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Faltan campos requeridos: fechaHora, presionArterial, frecuenciaCardiaca, \
             saturacionOxigeno, temperaturaCorporal, tallaM"
        );
    }

    #[tokio::test]
    async fn test_create_same_key_overwrites() {
        let app = setup_test_app();
        send(&app, "POST", "/triajes", Some(triage("12345678", "2024-01-01T10:00:00"))).await;

        let mut second = triage("12345678", "2024-01-01T10:00:00");
        second["pesoKg"] = json!("72");
        let (status, _) = send(&app, "POST", "/triajes", Some(second.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, listed) = send(&app, "GET", "/triajes?dni=12345678", None).await;
        assert_eq!(listed["items"].as_array().unwrap().len(), 1);

        let (_, stored) =
            send(&app, "GET", "/triajes/12345678/2024-01-01T10%3A00%3A00", None).await;
        assert_eq!(stored, second);
    }

    #[tokio::test]
    async fn test_list_projects_keys_in_order() {
        let app = setup_test_app();
        for stamp in ["2024-03-01T08:00:00", "2024-01-01T08:00:00", "2024-02-01T08:00:00"] {
            send(&app, "POST", "/triajes", Some(triage("12345678", stamp))).await;
        }
        send(&app, "POST", "/triajes", Some(triage("87654321", "2024-01-15T08:00:00"))).await;

        let (status, body) = send(&app, "GET", "/triajes?dni=12345678", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"items": [
                {"dni": "12345678", "fechaHora": "2024-01-01T08:00:00"},
                {"dni": "12345678", "fechaHora": "2024-02-01T08:00:00"},
                {"dni": "12345678", "fechaHora": "2024-03-01T08:00:00"}
            ]})
        );
    }

    #[tokio::test]
    async fn test_list_unknown_patient_is_empty() {
        let app = setup_test_app();
        let (status, body) = send(&app, "GET", "/triajes?dni=00000000", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"items": []}));
    }

    #[tokio::test]
    async fn test_list_requires_dni() {
        let app = setup_test_app();
        for uri in ["/triajes", "/triajes?dni=", "/triajes?other=1"] {
            let (status, body) = send(&app, "GET", uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["message"], "DNI requerido.");
        }
    }

    #[tokio::test]
    async fn test_list_with_repeated_dni_is_validation_error() {
        let app = setup_test_app();
        let (status, body) = send(&app, "GET", "/triajes?dni=a&dni=b", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "DNI requerido.");
    }

    #[tokio::test]
    async fn test_get_decodes_timestamp() {
        let app = setup_test_app();
        let input = triage("12345678", "2024-01-01T10:00:00");
        send(&app, "POST", "/triajes", Some(input.clone())).await;

        let (status, body) =
            send(&app, "GET", "/triajes/12345678/2024-01-01T10%3A00%3A00", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, input);
    }

    #[tokio::test]
    async fn test_get_decodes_spaces() {
        let app = setup_test_app();
        let input = triage("12345678", "2024-01-01 10:00");
        send(&app, "POST", "/triajes", Some(input.clone())).await;

        let (status, body) =
            send(&app, "GET", "/triajes/12345678/2024-01-01%2010%3A00", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, input);
    }

    #[tokio::test]
    async fn test_get_missing_record_is_not_found() {
        let app = setup_test_app();
        let (status, body) =
            send(&app, "GET", "/triajes/12345678/2024-01-01T10%3A00%3A00", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Triaje no encontrado.");
    }

    #[tokio::test]
    async fn test_get_blank_component_is_validation_error() {
        let app = setup_test_app();
        let (status, body) = send(&app, "GET", "/triajes/12345678/%20", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "DNI y fechaHora requeridos.");
    }

    #[tokio::test]
    async fn test_get_undecodable_component_is_validation_error() {
        let app = setup_test_app();
        for uri in ["/triajes/1/%FF", "/triajes/%FF/2024-01-01T10%3A00%3A00"] {
            let (status, body) = send(&app, "GET", uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["message"], "DNI y fechaHora requeridos.");
        }
    }

    #[tokio::test]
    async fn test_store_failure_on_get_is_internal_error() {
        let app = router(Arc::new(BrokenStore));
        let (status, body) =
            send(&app, "GET", "/triajes/12345678/2024-01-01T10%3A00%3A00", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Error al consultar triaje.");
    }
}
