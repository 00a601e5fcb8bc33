//! HTTP route definitions

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Extension, Query, State,
    },
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::app::AppState;
use crate::http::extract::{ApiJson, ApiPath};
use crate::http::middleware::{attach_session, requested_session_id, ActiveSession, SESSION_HEADER};
use crate::inventory::{Direction, Session, SessionError};
use crate::store::RecordStore;
use crate::util::time::uptime_secs;

/// Build the application router
pub fn build_router<S: RecordStore>(state: AppState<S>) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<HeaderValue> = state
        .config
        .client_origin
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::HeaderName::from_static(SESSION_HEADER)])
        .expose_headers([header::HeaderName::from_static(SESSION_HEADER)]);

    let public_routes = Router::new()
        .route("/health", get(health_handler::<S>))
        .route("/session", delete(close_session_handler::<S>));

    // Every route here runs against the caller's session
    let session_routes = Router::new()
        .route("/items", get(list_handler::<S>).post(add_handler::<S>))
        .route("/items/:index", delete(delete_handler::<S>))
        .route("/items/:index/adjust", post(adjust_handler::<S>))
        .route("/refresh", post(refresh_handler::<S>))
        .layer(middleware::from_fn_with_state(state.clone(), attach_session::<S>));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_sessions: usize,
}

async fn health_handler<S: RecordStore>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_sessions: state.sessions.len(),
    })
}

// ============================================================================
// Inventory endpoints
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ListedItem {
    pub index: usize,
    pub name: String,
    pub spec: String,
    pub qty: i64,
}

/// Listing returned by every session route
#[derive(Debug, Serialize, Deserialize)]
pub struct ListingResponse {
    pub items: Vec<ListedItem>,
    /// The last save failed; this session holds changes the shared sheet lacks
    pub unsynced: bool,
    /// Set when the last load failed and the listing fell back to empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

fn listing<S: RecordStore>(session: &Session<S>, term: &str) -> ListingResponse {
    let inventory = session.inventory();
    let items = session
        .search(term)
        .into_iter()
        .filter_map(|index| {
            inventory.get(index).map(|item| ListedItem {
                index,
                name: item.name.clone(),
                spec: item.spec.clone(),
                qty: item.qty,
            })
        })
        .collect();

    ListingResponse {
        items,
        unsynced: session.is_unsynced(),
        warning: session.load_warning().map(str::to_string),
    }
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn list_handler<S: RecordStore>(
    Extension(active): Extension<ActiveSession<S>>,
    Query(query): Query<SearchQuery>,
) -> Json<ListingResponse> {
    let session = active.session.lock().await;
    Json(listing(&session, &query.q))
}

#[derive(Deserialize)]
struct AddItemRequest {
    name: String,
    #[serde(default)]
    spec: String,
    #[serde(default)]
    qty: i64,
}

async fn add_handler<S: RecordStore>(
    State(state): State<AppState<S>>,
    Extension(active): Extension<ActiveSession<S>>,
    ApiJson(req): ApiJson<AddItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_mutation_quota(&state)?;

    let mut session = active.session.lock().await;
    session.add_item(&req.name, &req.spec, req.qty).await?;

    Ok((StatusCode::CREATED, Json(listing(&session, ""))))
}

#[derive(Deserialize)]
struct AdjustRequest {
    delta: u32,
    direction: Direction,
}

async fn adjust_handler<S: RecordStore>(
    State(state): State<AppState<S>>,
    Extension(active): Extension<ActiveSession<S>>,
    ApiPath(index): ApiPath<usize>,
    ApiJson(req): ApiJson<AdjustRequest>,
) -> Result<Json<ListingResponse>, AppError> {
    check_mutation_quota(&state)?;

    let mut session = active.session.lock().await;
    session.adjust_qty(index, req.delta, req.direction).await?;

    Ok(Json(listing(&session, "")))
}

async fn delete_handler<S: RecordStore>(
    State(state): State<AppState<S>>,
    Extension(active): Extension<ActiveSession<S>>,
    ApiPath(index): ApiPath<usize>,
) -> Result<Json<ListingResponse>, AppError> {
    check_mutation_quota(&state)?;

    let mut session = active.session.lock().await;
    session.delete_item(index).await?;

    Ok(Json(listing(&session, "")))
}

/// Reload from the shared sheet. A failed load still answers 200 with an
/// empty listing and a `warning`.
async fn refresh_handler<S: RecordStore>(
    Extension(active): Extension<ActiveSession<S>>,
) -> Json<ListingResponse> {
    let mut session = active.session.lock().await;
    if let Ok(rows) = session.refresh().await {
        info!(session = %active.id, rows, "Session refreshed");
    }
    Json(listing(&session, ""))
}

async fn close_session_handler<S: RecordStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let id = requested_session_id(&headers)
        .ok_or_else(|| AppError::BadRequest(format!("Missing or invalid {} header", SESSION_HEADER)))?;

    if state.sessions.close(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Unknown session {}", id)))
    }
}

fn check_mutation_quota<S>(state: &AppState<S>) -> Result<(), AppError> {
    state
        .mutation_limiter
        .check()
        .map_err(|_| AppError::RateLimited)
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Too many changes, try again shortly")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status().is_server_error() {
            AppError::Internal(rejection.body_text())
        } else {
            AppError::BadRequest(rejection.body_text())
        }
    }
}

/// Non-numeric or negative indices are client errors; a route whose pattern
/// lacks the parameter is ours
impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        if rejection.status().is_server_error() {
            AppError::Internal(rejection.body_text())
        } else {
            AppError::BadRequest(rejection.body_text())
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Validation(_) => AppError::BadRequest(err.to_string()),
            SessionError::NoSuchItem { .. } => AppError::NotFound(err.to_string()),
            SessionError::Save(_) => AppError::StoreUnavailable(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::StoreUnavailable(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::inventory::Item;
    use crate::store::memory::MemoryStore;

    fn test_config(mutations_per_minute: u32) -> Config {
        Config {
            server_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "debug".to_string(),
            spreadsheet: "sheet-123".to_string(),
            service_account_json: "{}".to_string(),
            sheets_api_base: "http://127.0.0.1:1".to_string(),
            client_origin: Some("http://localhost:3000".to_string()),
            mutations_per_minute,
            session_idle: std::time::Duration::from_secs(60),
        }
    }

    fn app(store: MemoryStore, mutations_per_minute: u32) -> (Router, AppState<MemoryStore>) {
        let state = AppState::new(test_config(mutations_per_minute), store);
        (build_router(state.clone()), state)
    }

    fn request(method: Method, uri: &str, session: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(id) = session {
            builder = builder.header(SESSION_HEADER, id);
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    /// Status, session header, and JSON body (Null when empty)
    async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let session = response
            .headers()
            .get(SESSION_HEADER)
            .map(|h| h.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, session, body)
    }

    #[tokio::test]
    async fn test_first_request_opens_session_and_lists_store() {
        let store = MemoryStore::with_rows(vec![Item::new("Cable-A", "outdoor", 10)]);
        let (router, state) = app(store, 100);

        let (status, session, body) = send(&router, request(Method::GET, "/items", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(session.is_some());
        assert_eq!(state.sessions.len(), 1);
        assert_eq!(
            body,
            json!({ "items": [{ "index": 0, "name": "Cable-A", "spec": "outdoor", "qty": 10 }], "unsynced": false })
        );

        // Same header, same session
        let (_, again, _) = send(&router, request(Method::GET, "/items", session.as_deref(), None)).await;
        assert_eq!(again, session);
        assert_eq!(state.sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_search_filters_by_query() {
        let store = MemoryStore::with_rows(vec![
            Item::new("Cable-A", "outdoor", 10),
            Item::new("HDMI", "indoor", 2),
        ]);
        let (router, _) = app(store, 100);

        let (_, _, body) = send(&router, request(Method::GET, "/items?q=INDOOR", None, None)).await;
        let listing: ListingResponse = serde_json::from_value(body).unwrap();
        assert_eq!(listing.items.len(), 1);
        assert_eq!(listing.items[0].index, 1);
        assert_eq!(listing.items[0].name, "HDMI");
    }

    #[tokio::test]
    async fn test_add_adjust_delete_flow() {
        let store = MemoryStore::default();
        let (router, _) = app(store.clone(), 100);

        let (status, session, body) = send(
            &router,
            request(Method::POST, "/items", None, Some(json!({ "name": "Cable-A", "spec": "outdoor", "qty": 10 }))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["items"][0]["qty"], 10);
        let session = session.unwrap();

        let (status, _, body) = send(
            &router,
            request(
                Method::POST,
                "/items/0/adjust",
                Some(&session),
                Some(json!({ "delta": 20, "direction": "decrement" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"][0]["qty"], -10);
        assert_eq!(store.rows()[0].qty, -10);

        let (status, _, body) = send(&router, request(Method::DELETE, "/items/0", Some(&session), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"], json!([]));
        assert!(store.rows().is_empty());
    }

    #[tokio::test]
    async fn test_empty_name_is_bad_request() {
        let store = MemoryStore::default();
        let (router, _) = app(store.clone(), 100);

        let (status, _, body) = send(
            &router,
            request(Method::POST, "/items", None, Some(json!({ "name": "", "qty": 3 }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Item name must not be empty");
        assert_eq!(store.saves(), 0);
    }

    #[tokio::test]
    async fn test_malformed_adjust_body_is_json_bad_request() {
        let store = MemoryStore::with_rows(vec![Item::new("Cable-A", "", 5)]);
        let (router, _) = app(store.clone(), 100);

        for body in [
            json!({ "delta": -3, "direction": "decrement" }),
            json!({ "delta": 3, "direction": "sideways" }),
            json!({ "direction": "increment" }),
        ] {
            let (status, _, body) =
                send(&router, request(Method::POST, "/items/0/adjust", None, Some(body))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].is_string());
        }
        assert_eq!(store.saves(), 0);
        assert_eq!(store.rows()[0].qty, 5);
    }

    #[tokio::test]
    async fn test_non_numeric_index_is_json_bad_request() {
        let (router, _) = app(MemoryStore::default(), 100);

        for uri in ["/items/abc", "/items/-1"] {
            let (status, _, body) = send(&router, request(Method::DELETE, uri, None, None)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_add_without_json_content_type_is_bad_request() {
        let (router, _) = app(MemoryStore::default(), 100);
        let req = Request::builder()
            .method(Method::POST)
            .uri("/items")
            .body(Body::from(r#"{"name":"Patch"}"#))
            .unwrap();

        let (status, _, body) = send(&router, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Content-Type"));
    }

    #[test]
    fn test_internal_error_is_500() {
        let response = AppError::Internal("lost".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unknown_index_is_not_found() {
        let (router, _) = app(MemoryStore::default(), 100);
        let (status, _, _) = send(&router, request(Method::DELETE, "/items/5", None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failed_save_is_bad_gateway_and_marks_unsynced() {
        let store = MemoryStore::with_rows(vec![Item::new("Cable-A", "", 1)]);
        let (router, _) = app(store.clone(), 100);
        let (_, session, _) = send(&router, request(Method::GET, "/items", None, None)).await;

        store.fail_saves(true);
        let (status, _, body) = send(
            &router,
            request(
                Method::POST,
                "/items/0/adjust",
                session.as_deref(),
                Some(json!({ "delta": 2, "direction": "increment" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("may not have reached"));

        let (_, _, body) = send(&router, request(Method::GET, "/items", session.as_deref(), None)).await;
        assert_eq!(body["unsynced"], true);
        assert_eq!(body["items"][0]["qty"], 3);
    }

    #[tokio::test]
    async fn test_refresh_with_failed_load_warns() {
        let store = MemoryStore::with_rows(vec![Item::new("Cable-A", "", 1)]);
        let (router, _) = app(store.clone(), 100);
        let (_, session, _) = send(&router, request(Method::GET, "/items", None, None)).await;

        store.fail_loads(true);
        let (status, _, body) = send(&router, request(Method::POST, "/refresh", session.as_deref(), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"], json!([]));
        assert!(body["warning"].as_str().unwrap().contains("Failed to read sheet"));
    }

    #[tokio::test]
    async fn test_mutations_are_rate_limited() {
        let (router, _) = app(MemoryStore::default(), 1);

        let add = || request(Method::POST, "/items", None, Some(json!({ "name": "Patch" })));
        let (first, _, _) = send(&router, add()).await;
        let (second, _, _) = send(&router, add()).await;
        assert_eq!(first, StatusCode::CREATED);
        assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_close_session() {
        let (router, state) = app(MemoryStore::default(), 100);
        let (_, session, _) = send(&router, request(Method::GET, "/items", None, None)).await;

        let (status, _, _) = send(&router, request(Method::DELETE, "/session", session.as_deref(), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(state.sessions.len(), 0);

        let (status, _, _) = send(&router, request(Method::DELETE, "/session", session.as_deref(), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, _) = send(&router, request(Method::DELETE, "/session", None, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_reports_sessions() {
        let (router, _) = app(MemoryStore::default(), 100);
        send(&router, request(Method::GET, "/items", None, None)).await;

        let (status, _, body) = send(&router, request(Method::GET, "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["active_sessions"], 1);
    }
}
