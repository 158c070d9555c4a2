use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use docindex_core::{
    IndexError, IndexStats, IndexedDocument, IndexingService, IndexingState, RebuildSummary, SearchResult, SourceDocument,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_K: usize = 100;

type ApiError = (StatusCode, String);

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Required in `X-ADMIN-TOKEN` for mutating routes. Unset disables them.
    pub admin_token: Option<String>,
    /// Allowed CORS origins; empty allows any.
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Read `ADMIN_TOKEN` and `CORS_ALLOW_ORIGIN` (comma-separated).
    pub fn from_env() -> Self {
        let admin_token = std::env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty());
        let cors_origins = std::env::var("CORS_ALLOW_ORIGIN")
            .map(|val| val.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        Self { admin_token, cors_origins }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service: IndexingService,
    pub admin_token: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub k: Option<usize>,
}

#[derive(Deserialize)]
pub struct RecentParams {
    #[serde(default = "default_recent_limit")]
    pub limit: usize,
}
fn default_recent_limit() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_ms: u128,
    /// Matching documents before `k` was applied.
    pub total_hits: usize,
    pub results: Vec<SearchResult>,
}

/// A stored document without its frequency table.
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub word_count: usize,
    pub indexed_at: i64,
    pub preview: String,
}

impl From<IndexedDocument> for DocumentSummary {
    fn from(doc: IndexedDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            doc_type: doc.doc_type,
            word_count: doc.word_count,
            indexed_at: doc.indexed_at,
            preview: doc.content_preview,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IndexRequest {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    pub content: String,
}

impl From<IndexRequest> for SourceDocument {
    fn from(req: IndexRequest) -> Self {
        let derived = SourceDocument::from_locator(&req.id, req.content);
        SourceDocument {
            name: req.name.unwrap_or(derived.name),
            doc_type: req.doc_type.unwrap_or(derived.doc_type),
            ..derived
        }
    }
}

pub fn build_app(service: IndexingService, config: ServerConfig) -> Router {
    let cors = if config.cors_origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins: Vec<_> = config.cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
    };
    let state = AppState { service, admin_token: config.admin_token };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/recent", get(recent_handler))
        .route("/stats", get(stats_handler))
        .route("/state", get(state_handler))
        .route("/documents", post(index_handler))
        .route("/documents/:id", get(doc_handler).delete(remove_handler))
        .route("/rebuild", post(rebuild_handler))
        .route("/index", delete(clear_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn index_error(e: IndexError) -> ApiError {
    let status = match &e {
        IndexError::Indexing(_) => StatusCode::BAD_REQUEST,
        IndexError::ShutDown => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %e, "request failed");
    }
    (status, e.to_string())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let k = params
        .k
        .unwrap_or(state.service.config().default_max_results)
        .clamp(1, MAX_K);
    let hits = state.service.search_hits(&params.q, Some(k)).await.map_err(index_error)?;
    Ok(Json(SearchResponse {
        query: params.q,
        took_ms: start.elapsed().as_millis(),
        total_hits: hits.total_hits,
        results: hits.results,
    }))
}

pub async fn recent_handler(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> Result<Json<Vec<DocumentSummary>>, ApiError> {
    let docs = state.service.recently_indexed(params.limit).await.map_err(index_error)?;
    Ok(Json(docs.into_iter().map(DocumentSummary::from).collect()))
}

pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<IndexStats>, ApiError> {
    state.service.stats().await.map(Json).map_err(index_error)
}

pub async fn state_handler(State(state): State<AppState>) -> Json<IndexingState> {
    Json(state.service.state())
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentSummary>, ApiError> {
    match state.service.get(&id).await.map_err(index_error)? {
        Some(doc) => Ok(Json(doc.into())),
        None => Err((StatusCode::NOT_FOUND, format!("document {id} not found"))),
    }
}

async fn index_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<IndexRequest>,
) -> Result<(StatusCode, Json<DocumentSummary>), ApiError> {
    authorize(&state, &headers)?;
    let doc = state.service.index_document(req.into()).await.map_err(index_error)?;
    Ok((StatusCode::CREATED, Json(doc.into())))
}

async fn remove_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, &headers)?;
    if state.service.remove_document(&id).await.map_err(index_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, format!("document {id} not found")))
    }
}

async fn rebuild_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(reqs): Json<Vec<IndexRequest>>,
) -> Result<Json<RebuildSummary>, ApiError> {
    authorize(&state, &headers)?;
    let docs = reqs.into_iter().map(SourceDocument::from).collect();
    state.service.rebuild_index(docs).await.map(Json).map_err(index_error)
}

async fn clear_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode, ApiError> {
    authorize(&state, &headers)?;
    state.service.clear_index().await.map_err(index_error)?;
    Ok(StatusCode::NO_CONTENT)
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
