use anyhow::Result;
use axum::{
    async_trait,
    extract::{FromRequestParts, Query, State},
    http::{request::Parts, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use engine::{
    EngineConfig, ItemNames, Recommendation, Recommender, RecommenderError, SearchHit, DEFAULT_LIST_LIMIT,
    DEFAULT_SEARCH_LIMIT, DEFAULT_TOP_N,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_RESULTS: usize = 100;
const ADMIN_HEADER: &str = "X-ADMIN-TOKEN";

/// Where the recommender is (re)built from.
#[derive(Debug, Clone)]
pub enum ModelSource {
    Catalog { path: PathBuf, config: EngineConfig },
    Snapshot(PathBuf),
}

impl ModelSource {
    pub fn load(&self) -> Result<Recommender, RecommenderError> {
        match self {
            ModelSource::Catalog { path, config } => Recommender::load(path, config),
            ModelSource::Snapshot(dir) => Recommender::from_snapshot(dir),
        }
    }
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}
fn default_search_limit() -> usize { DEFAULT_SEARCH_LIMIT }

#[derive(Deserialize)]
pub struct ListParams {
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}
fn default_list_limit() -> usize { DEFAULT_LIST_LIMIT }

#[derive(Deserialize)]
pub struct RecommendRequest {
    pub games: ItemNames,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}
fn default_top_n() -> usize { DEFAULT_TOP_N }

#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct ListResponse {
    pub games: Vec<String>,
}

#[derive(Serialize)]
pub struct RecommendResponse {
    pub recommendations: Vec<Recommendation>,
    pub unresolved: Vec<String>,
}

#[derive(Clone)]
pub struct AppState {
    // Swapped as a whole on reload; handlers clone the inner Arc and drop the lock.
    pub recommender: Arc<RwLock<Arc<Recommender>>>,
    pub source: Option<ModelSource>,
    pub admin_token: Option<String>,
    /// Comma-separated allowed origins; any origin when unset or empty.
    pub cors_origins: Option<String>,
}

impl AppState {
    pub fn new(recommender: Recommender, source: Option<ModelSource>, admin_token: Option<String>) -> Self {
        Self { recommender: Arc::new(RwLock::new(Arc::new(recommender))), source, admin_token, cors_origins: None }
    }

    pub fn with_cors_origins(mut self, origins: Option<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    fn current(&self) -> Arc<Recommender> {
        self.recommender.read().clone()
    }
}

pub fn build_app(source: ModelSource) -> Result<Router> {
    // Load errors abort startup.
    let recommender = source.load()?;
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let state = AppState::new(recommender, Some(source), admin_token).with_cors_origins(std::env::var("CORS_ALLOW_ORIGIN").ok());
    Ok(router(state))
}

fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let allowed: Vec<HeaderValue> =
        origins.into_iter().flat_map(|v| v.split(',')).filter_map(|o| o.trim().parse().ok()).collect();
    let origin = if allowed.is_empty() { AllowOrigin::any() } else { AllowOrigin::list(allowed) };
    CorsLayer::new().allow_origin(origin).allow_methods(Any).allow_headers(Any)
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(state.cors_origins.as_deref());
    Router::new()
        .route("/", get(|| async { Json(serde_json::json!({ "message": "Game Recommender API is running" })) }))
        .route("/health", get(|| async { "ok" }))
        .route("/games", get(search_handler))
        .route("/games/all", get(list_handler))
        .route("/recommend", post(recommend_handler))
        .route("/admin/reload", post(reload_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let limit = params.limit.clamp(1, MAX_RESULTS);
    Json(SearchResponse { results: state.current().search(&params.query, limit) })
}

pub async fn list_handler(State(state): State<AppState>, Query(params): Query<ListParams>) -> Json<ListResponse> {
    Json(ListResponse { games: state.current().list(params.limit) })
}

pub async fn recommend_handler(State(state): State<AppState>, Json(req): Json<RecommendRequest>) -> Json<RecommendResponse> {
    let top_n = req.top_n.clamp(1, MAX_RESULTS);
    let response = match state.current().recommend(req.games, top_n) {
        Ok(recs) => {
            tracing::info!(returned = recs.items.len(), "recommendations generated");
            RecommendResponse { recommendations: recs.items, unresolved: recs.unresolved }
        }
        Err(RecommenderError::NoValidItemsFound { unresolved }) => {
            RecommendResponse { recommendations: vec![Recommendation::no_valid_items()], unresolved }
        }
        Err(e) => {
            tracing::error!(error = %e, "recommendation failed");
            RecommendResponse { recommendations: vec![Recommendation::no_valid_items()], unresolved: vec![] }
        }
    };
    Json(response)
}

/// Extractor guarding admin routes: `X-ADMIN-TOKEN` must equal the configured
/// `ADMIN_TOKEN`. Without a configured token every admin request is refused.
pub struct Admin;

#[async_trait]
impl FromRequestParts<AppState> for Admin {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(required) = state.admin_token.as_deref() else {
            return Err((StatusCode::UNAUTHORIZED, "admin routes disabled: ADMIN_TOKEN not set".to_string()));
        };
        match parts.headers.get(ADMIN_HEADER).map(HeaderValue::as_bytes) {
            Some(provided) if provided == required.as_bytes() => Ok(Admin),
            _ => {
                tracing::warn!(path = %parts.uri.path(), "rejected admin request");
                Err((StatusCode::UNAUTHORIZED, "invalid admin token".to_string()))
            }
        }
    }
}

async fn reload_handler(_: Admin, State(state): State<AppState>) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let source = state.source.clone().ok_or((StatusCode::CONFLICT, "no reloadable source configured".to_string()))?;
    let fresh = tokio::task::spawn_blocking(move || source.load())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| {
            tracing::warn!(error = %e, "reload failed, keeping current model");
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        })?;
    let items = fresh.catalog().len();
    *state.recommender.write() = Arc::new(fresh);
    tracing::info!(items, "model reloaded");
    Ok(Json(serde_json::json!({ "reloaded": true, "items": items })))
}
