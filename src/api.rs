// 🌐 REST API - axum router over the query engine and the metadata decoder
//
//   GET  /api/health                     dataset info
//   GET  /api/entities                   sorted entity names
//   GET  /api/municipalities?entity=..   sorted municipality names ([] when unknown)
//   POST /api/query                      entity / municipality query
//   GET  /api/chart?entity=..            bar chart payload
//   POST /api/exif                       multipart upload, field "image"

use crate::aggregator::DatasetInfo;
use crate::error::CensusError;
use crate::metadata::{ImageMetadata, MetadataDecoder};
use crate::query::{Query, QueryEngine, QueryResponse};
use crate::chart::BarChart;
use axum::{
    extract::{Multipart, Query as QueryParams, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: QueryEngine,
    pub decoder: Arc<dyn MetadataDecoder>,
}

impl AppState {
    pub fn new(engine: QueryEngine, decoder: Arc<dyn MetadataDecoder>) -> Self {
        AppState { engine, decoder }
    }
}

// ============================================================================
// RESPONSE ENVELOPE
// ============================================================================

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExifResponse {
    pub exif: ImageMetadata,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Census(CensusError),
    BadRequest(String),
}

impl From<CensusError> for ApiError {
    fn from(err: CensusError) -> Self {
        ApiError::Census(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            ApiError::Census(err) => {
                let status = match &err {
                    CensusError::NotFound { .. } => StatusCode::NOT_FOUND,
                    CensusError::InvalidRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    CensusError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if err.is_recoverable() {
                    log::debug!("request rejected: {}", err);
                } else {
                    log::error!("request failed: {}", err);
                }
                (status, err.to_string(), err.code())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "bad_request"),
        };

        let body = Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message),
            code: Some(code.to_string()),
        });

        (status, body).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// API Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct EntityParams {
    pub entity: String,
}

/// GET /api/health - Health check
async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<DatasetInfo>> {
    Json(ApiResponse::ok(state.engine.store().info().clone()))
}

/// GET /api/entities
async fn list_entities(State(state): State<AppState>) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::ok(state.engine.entities()))
}

/// GET /api/municipalities?entity=<name>
async fn list_municipalities(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<EntityParams>,
) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::ok(state.engine.municipalities(&params.entity)))
}

/// POST /api/query
async fn run_query(State(state): State<AppState>, Json(query): Json<Query>) -> ApiResult<QueryResponse> {
    let response = state.engine.execute(&query)?;
    Ok(Json(ApiResponse::ok(response)))
}

/// GET /api/chart?entity=<name>
async fn entity_chart(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<EntityParams>,
) -> ApiResult<BarChart> {
    let chart = state
        .engine
        .chart(&params.entity)
        .ok_or_else(|| CensusError::entity_not_found(params.entity.as_str()))?;
    Ok(Json(ApiResponse::ok(chart)))
}

/// POST /api/exif - multipart form with an "image" file field
async fn extract_exif(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<ExifResponse> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some("image") {
            continue;
        }

        if field.file_name().map_or(true, str::is_empty) {
            return Err(ApiError::BadRequest("uploaded file has no name".to_string()));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("could not read upload: {}", e)))?;

        let exif = state.decoder.decode(&bytes)?;
        return Ok(Json(ApiResponse::ok(ExifResponse { exif })));
    }

    Err(ApiError::BadRequest("missing file field 'image'".to_string()))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/entities", get(list_entities))
        .route("/municipalities", get(list_municipalities))
        .route("/query", post(run_query))
        .route("/chart", get(entity_chart))
        .route("/exif", post(extract_exif))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::CensusStore;
    use crate::dataset::RegionRecord;
    use crate::error::Result as CensusResult;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct FixedDecoder;

    impl MetadataDecoder for FixedDecoder {
        fn decode(&self, bytes: &[u8]) -> CensusResult<ImageMetadata> {
            if bytes.starts_with(b"JPEG") {
                Ok(ImageMetadata {
                    camera_make: Some("Canon".to_string()),
                    ..ImageMetadata::default()
                })
            } else {
                Err(CensusError::Decode("no EXIF data".to_string()))
            }
        }
    }

    fn create_test_app() -> Router {
        let store = CensusStore::from_records(vec![
            RegionRecord::new("21", "Puebla", "001", "Acajete", 60),
            RegionRecord::new("21", "Puebla", "001", "Acajete", 40),
            RegionRecord::new("30", "Veracruz", "087", "Xalapa", 488531),
        ])
        .unwrap();
        let engine = QueryEngine::with_max_age_span(Arc::new(store), 120);
        router(AppState::new(engine, Arc::new(FixedDecoder)))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
        let boundary = "XBOUNDARYX";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/exif")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(create_test_app(), get_request("/api/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["recordCount"], 3);
        assert_eq!(body["data"]["entityCount"], 2);
    }

    #[tokio::test]
    async fn test_entities() {
        let (status, body) = send(create_test_app(), get_request("/api/entities")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], json!(["Puebla", "Veracruz"]));
    }

    #[tokio::test]
    async fn test_municipalities_known_and_unknown() {
        let (status, body) =
            send(create_test_app(), get_request("/api/municipalities?entity=Puebla")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!(["Acajete"]));

        let (status, body) =
            send(create_test_app(), get_request("/api/municipalities?entity=Atlantis")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn test_entity_query() {
        let request = post_json("/api/query", json!({"type": "entity", "entity": "Puebla"}));
        let (status, body) = send(create_test_app(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["data"],
            json!({"entity": "Puebla", "totalPopulation": 100, "censusYear": 2020})
        );
    }

    #[tokio::test]
    async fn test_entity_query_not_found() {
        let request = post_json("/api/query", json!({"type": "entity", "entity": "Atlantis"}));
        let (status, body) = send(create_test_app(), request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "not_found");
        assert!(body["error"].as_str().unwrap().contains("Atlantis"));
    }

    #[tokio::test]
    async fn test_municipality_query() {
        let request = post_json(
            "/api/query",
            json!({
                "type": "municipality",
                "entity": "Puebla",
                "municipality": "Acajete",
                "ageMin": 0,
                "ageMax": 4
            }),
        );
        let (status, body) = send(create_test_app(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["ageRange"], json!([0, 4]));
        let persons: Vec<u64> = body["data"]["table"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["persons"].as_u64().unwrap())
            .collect();
        assert_eq!(persons, vec![12, 22, 33, 22, 11]);
    }

    #[tokio::test]
    async fn test_municipality_query_invalid_range() {
        let request = post_json(
            "/api/query",
            json!({
                "type": "municipality",
                "entity": "Puebla",
                "municipality": "Acajete",
                "ageMin": 10,
                "ageMax": 2
            }),
        );
        let (status, body) = send(create_test_app(), request).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "invalid_range");
    }

    #[tokio::test]
    async fn test_municipality_query_range_too_large() {
        let query = |age_max: i32| {
            post_json(
                "/api/query",
                json!({
                    "type": "municipality",
                    "entity": "Puebla",
                    "municipality": "Acajete",
                    "ageMin": 0,
                    "ageMax": age_max
                }),
            )
        };

        let (status, body) = send(create_test_app(), query(119)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["table"].as_array().unwrap().len(), 120);

        let (status, body) = send(create_test_app(), query(120)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["code"], "range_too_large");
        assert!(body["error"].as_str().unwrap().contains("limit is 120"));
    }

    #[tokio::test]
    async fn test_chart() {
        let (status, body) = send(create_test_app(), get_request("/api/chart?entity=Veracruz")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["type"], "bar");
        assert_eq!(body["data"]["series"][0]["value"], 488531);

        let (status, _) = send(create_test_app(), get_request("/api/chart?entity=Atlantis")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_exif_upload() {
        let request = multipart_request("image", "photo.jpg", b"JPEG bytes");
        let (status, body) = send(create_test_app(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["exif"]["cameraMake"], "Canon");
    }

    #[tokio::test]
    async fn test_exif_missing_field() {
        let request = multipart_request("document", "photo.jpg", b"JPEG bytes");
        let (status, body) = send(create_test_app(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("image"));
    }

    #[tokio::test]
    async fn test_exif_empty_filename() {
        let request = multipart_request("image", "", b"JPEG bytes");
        let (status, _) = send(create_test_app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_exif_decode_failure() {
        let request = multipart_request("image", "notes.txt", b"plain text");
        let (status, body) = send(create_test_app(), request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "decode_error");
    }
}
