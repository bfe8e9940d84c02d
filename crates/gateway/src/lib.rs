//! HTTP API gateway for OathLink.
//!
//! Exposes memory write/search, prompt composition, and settings over JSON,
//! behind an optional shared-secret header.
//!
//! Built on Axum.

pub mod api;
pub mod error;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use oathlink_compose::{Composer, PromptTemplate};
use oathlink_config::AppConfig;
use oathlink_core::OathError;
use oathlink_core::error::StorageError;
use oathlink_core::generation::Generator;
use oathlink_core::memory::{MemorySearch, MemoryStore};
use oathlink_core::settings::SettingsStore;
use oathlink_memory::{SqliteStore, StoreOptions};
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::error::ApiError;

/// Header carrying the shared secret.
pub const AUTH_HEADER: &str = "X-Auth-Token";

/// Paths reachable without a token.
const PUBLIC_PATHS: &[&str] = &["/health", "/", "/routes"];

/// Shared application state for the gateway.
///
/// The three store handles usually point at the same backend.
pub struct GatewayState {
    pub config: AppConfig,
    pub store: Arc<dyn MemoryStore>,
    pub search: Arc<dyn MemorySearch>,
    pub settings: Arc<dyn SettingsStore>,
    pub composer: Arc<Composer>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new<B>(config: AppConfig, backend: Arc<B>, generator: Option<Arc<dyn Generator>>) -> Self
    where
        B: MemoryStore + MemorySearch + SettingsStore + 'static,
    {
        let composer = build_composer(&config, backend.clone(), generator);
        Self {
            config,
            store: backend.clone(),
            search: backend.clone(),
            settings: backend,
            composer: Arc::new(composer),
        }
    }
}

/// Store limits derived from `[memory]`.
pub fn store_options(config: &AppConfig) -> StoreOptions {
    StoreOptions {
        max_limit: config.memory.max_limit,
        timeout: Duration::from_millis(config.memory.timeout_ms),
    }
}

/// Open the configured SQLite store. One handle per process.
pub async fn open_store(config: &AppConfig) -> Result<Arc<SqliteStore>, StorageError> {
    let store = SqliteStore::open(&config.memory.db_path, store_options(config)).await?;
    Ok(Arc::new(store))
}

/// Wire a composer over `backend`, reading the persona from its settings.
pub fn build_composer<B>(
    config: &AppConfig,
    backend: Arc<B>,
    generator: Option<Arc<dyn Generator>>,
) -> Composer
where
    B: MemorySearch + SettingsStore + 'static,
{
    Composer::new(backend.clone(), PromptTemplate::from_config(&config.compose))
        .with_settings(backend)
        .with_generator(generator)
        .with_generation_timeout(Duration::from_secs(config.provider.timeout_secs))
}

/// Build the Axum router with all gateway routes.
///
/// Layers, innermost first: token check, body size limit, HTTP tracing.
pub fn build_router(state: SharedState) -> Router {
    let body_limit = state.config.gateway.body_limit_bytes;

    Router::new()
        .route("/", get(api::index_handler))
        .route("/health", get(api::health_handler))
        .route("/routes", get(api::routes_handler))
        .route("/memory/write", post(api::memory_write_handler))
        .route("/memory/search", get(api::memory_search_handler))
        .route("/compose", post(api::compose_handler))
        .route(
            "/settings/{key}",
            get(api::get_setting_handler).put(api::put_setting_handler),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server and run until Ctrl-C.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let store = open_store(&config).await?;
    let generator = oathlink_providers::build_from_config(&config);
    if !config.auth_enabled() {
        warn!("No auth token configured; every route is open");
    }

    let state = Arc::new(GatewayState::new(config, store.clone(), generator));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, db = %store.path().display(), "Gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not install Ctrl-C handler; shutdown only by kill");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Length check, then constant-time byte comparison.
fn token_matches(expected: &str, provided: &str) -> bool {
    expected.len() == provided.len() && bool::from(expected.as_bytes().ct_eq(provided.as_bytes()))
}

/// Shared-secret check. A no-op when no token is configured.
async fn auth_middleware(
    State(state): State<SharedState>,
    req: axum::extract::Request,
    next: Next,
) -> Response {
    let Some(expected) = state.config.gateway.token() else {
        return next.run(req).await;
    };

    if PUBLIC_PATHS.contains(&req.uri().path()) {
        return next.run(req).await;
    }

    let provided = req
        .headers()
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(token) if token_matches(expected, token) => next.run(req).await,
        Some(_) => {
            warn!(path = %req.uri().path(), "Rejected request with wrong auth token");
            ApiError(OathError::Auth("invalid auth token".into())).into_response()
        }
        None => {
            warn!(path = %req.uri().path(), "Rejected request without auth token");
            ApiError(OathError::Auth(format!("missing {AUTH_HEADER} header"))).into_response()
        }
    }
}
