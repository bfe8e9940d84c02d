//! Route handlers and their request/response bodies.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use oathlink_core::memory::{self, MemoryRecord};
use oathlink_core::settings;
use oathlink_core::OathError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::SharedState;
use crate::error::{ApiError, ErrorBody};

/// Every route the gateway serves, as listed by `GET /` and `GET /routes`.
pub const ROUTES: &[&str] = &[
    "GET /",
    "GET /health",
    "GET /routes",
    "POST /memory/write",
    "GET /memory/search",
    "POST /compose",
    "GET /settings/{key}",
    "PUT /settings/{key}",
];

/// Substring search is the only mode.
pub const SEARCH_MODE: &str = "substring";

// ── Service info ──────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub ts: f64,
    pub store: bool,
}

/// `GET /health` — liveness plus a store check.
pub async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        ts: memory::now_epoch_secs(),
        store: state.store.health().await,
    })
}

#[derive(Serialize)]
pub struct IndexResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub routes: &'static [&'static str],
}

pub async fn index_handler() -> Json<IndexResponse> {
    Json(IndexResponse {
        name: "oathlink",
        version: env!("CARGO_PKG_VERSION"),
        routes: ROUTES,
    })
}

#[derive(Serialize)]
pub struct RoutesResponse {
    pub routes: &'static [&'static str],
}

pub async fn routes_handler() -> Json<RoutesResponse> {
    Json(RoutesResponse { routes: ROUTES })
}

/// Caller-supplied `top_k`, or the configured default. Negative values are
/// out of range like any other; the upper bound is checked by the search.
fn resolve_limit(top_k: Option<i64>, default: usize) -> Result<usize, OathError> {
    match top_k {
        None => Ok(default),
        Some(n) => usize::try_from(n)
            .map_err(|_| OathError::validation(format!("top_k must be at least 1, got {n}"))),
    }
}

// ── Memory ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct WriteRequest {
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Serialize)]
pub struct WriteResponse {
    pub ok: bool,
    pub id: String,
}

/// `POST /memory/write`
pub async fn memory_write_handler(
    State(state): State<SharedState>,
    Json(payload): Json<WriteRequest>,
) -> Result<Json<WriteResponse>, ApiError> {
    let id = state.store.store(&payload.content, &payload.tags).await?;
    info!(id = %id, tags = payload.tags.len(), "Memory written");
    Ok(Json(WriteResponse { ok: true, id }))
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub top_k: Option<i64>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub ok: bool,
    pub results: Vec<MemoryRecord>,
}

/// `GET /memory/search?q=&top_k=`
pub async fn memory_search_handler(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let limit = resolve_limit(params.top_k, state.config.memory.default_limit)?;
    let results = state.search.search(&params.q, limit).await?;
    Ok(Json(SearchResponse { ok: true, results }))
}

// ── Compose ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ComposeRequest {
    pub input: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub top_k: Option<i64>,
}

#[derive(Serialize)]
pub struct PromptParts {
    pub system: String,
    pub user: String,
}

#[derive(Serialize)]
pub struct ComposeResponse {
    pub ok: bool,
    pub prompt: String,
    pub prompt_parts: PromptParts,
    pub context_hits: Vec<MemoryRecord>,
    pub output: Option<String>,
    pub model_used: Option<String>,
    pub search_mode: &'static str,
}

/// `POST /compose`
pub async fn compose_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ComposeRequest>,
) -> Result<Json<ComposeResponse>, ApiError> {
    let limit = resolve_limit(payload.top_k, state.config.memory.default_limit)?;
    let outcome = state
        .composer
        .compose(&payload.input, &payload.tags, limit)
        .await?;

    Ok(Json(ComposeResponse {
        ok: true,
        prompt: outcome.prompt,
        prompt_parts: PromptParts {
            system: outcome.persona,
            user: outcome.user_block,
        },
        context_hits: outcome.hits,
        output: outcome.generated_output,
        model_used: outcome.model_used,
        search_mode: SEARCH_MODE,
    }))
}

// ── Settings ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct SettingResponse {
    pub key: String,
    pub value: Value,
}

/// `GET /settings/{key}` — 404 when the key was never set.
pub async fn get_setting_handler(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    settings::validate_key(&key)?;
    let value = state
        .settings
        .get_setting(&key)
        .await
        .map_err(OathError::from)?;

    Ok(match value {
        Some(value) => Json(SettingResponse { key, value }).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody::new("not_found", format!("No setting named '{key}'"))),
        )
            .into_response(),
    })
}

#[derive(Deserialize)]
pub struct PutSettingRequest {
    pub value: Value,
}

#[derive(Serialize)]
pub struct PutSettingResponse {
    pub ok: bool,
    pub key: String,
}

/// `PUT /settings/{key}`
pub async fn put_setting_handler(
    State(state): State<SharedState>,
    Path(key): Path<String>,
    Json(payload): Json<PutSettingRequest>,
) -> Result<Json<PutSettingResponse>, ApiError> {
    settings::validate_key(&key)?;
    state
        .settings
        .put_setting(&key, &payload.value)
        .await
        .map_err(OathError::from)?;
    info!(key = %key, "Setting updated");
    Ok(Json(PutSettingResponse { ok: true, key }))
}
