//! End-to-end integration tests for OathLink.
//!
//! These run the real stack in-process: TOML config, SQLite store, composer,
//! and the HTTP router, driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use oathlink_config::AppConfig;
use oathlink_core::error::GenerationError;
use oathlink_core::generation::{GenerationRequest, Generator};
use oathlink_core::memory::{MemorySearch, MemoryStore};
use oathlink_gateway::{GatewayState, SharedState, build_router, open_store};
use oathlink_memory::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt;

// ── Mock Generator ───────────────────────────────────────────────────────

/// A generator that counts calls and always fails.
struct BrokenGenerator {
    calls: std::sync::Mutex<usize>,
}

impl BrokenGenerator {
    fn new() -> Self {
        Self {
            calls: std::sync::Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl Generator for BrokenGenerator {
    fn name(&self) -> &str {
        "e2e_broken"
    }

    fn model(&self) -> &str {
        "broken-1"
    }

    async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
        *self.calls.lock().unwrap() += 1;
        Err(GenerationError::Api {
            status_code: 500,
            message: "upstream exploded".into(),
        })
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn config_in(dir: &tempfile::TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.memory.db_path = dir.path().join("memory.db").display().to_string();
    config
}

async fn sqlite_state(
    config: AppConfig,
    generator: Option<Arc<dyn Generator>>,
) -> (SharedState, Arc<SqliteStore>) {
    let store = open_store(&config).await.unwrap();
    let state = Arc::new(GatewayState::new(config, store.clone(), generator));
    (state, store)
}

async fn call(state: &SharedState, req: Request<Body>) -> (StatusCode, Value) {
    let response = build_router(state.clone()).oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn write_req(content: &str, tags: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/memory/write")
        .header("content-type", "application/json")
        .body(Body::from(json!({"content": content, "tags": tags}).to_string()))
        .unwrap()
}

fn compose_req(input: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/compose")
        .header("content-type", "application/json")
        .body(Body::from(json!({"input": input}).to_string()))
        .unwrap()
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_write_search_compose() {
    let dir = tempfile::tempdir().unwrap();
    let (state, store) = sqlite_state(config_in(&dir), None).await;

    let (status, json) = call(&state, write_req("hello world", json!([]))).await;
    assert_eq!(status, StatusCode::OK);
    let id = json["id"].as_str().unwrap().to_string();

    let req = Request::builder()
        .uri("/memory/search?q=world&top_k=3")
        .body(Body::empty())
        .unwrap();
    let (_, json) = call(&state, req).await;
    assert_eq!(json["results"][0]["id"], id.as_str());

    let (status, json) = call(&state, compose_req("hello")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["context_hits"][0]["content"], "hello world");
    let prompt = json["prompt"].as_str().unwrap();
    assert!(prompt.contains("- hello world"));
    assert!(!prompt.contains("(no matching memory)"));

    store.close().await;
}

#[tokio::test]
async fn e2e_errand_scenario_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let (state, store) = sqlite_state(config_in(&dir), None).await;

    let (_, a) = call(&state, write_req("buy milk", json!(["errand"]))).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let (_, b) = call(&state, write_req("buy eggs", json!(["errand"]))).await;

    let hits = store.search("errand", 10).await.unwrap();
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec![b["id"].as_str().unwrap(), a["id"].as_str().unwrap()]);

    let hits = store.search("errand", 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].content, "buy eggs");

    store.close().await;
}

#[tokio::test]
async fn e2e_memories_survive_restart() {
    let dir = tempfile::tempdir().unwrap();

    let (state, store) = sqlite_state(config_in(&dir), None).await;
    call(&state, write_req("remember the anchor phrase", json!(["oath"]))).await;
    store.close().await;
    drop(state);

    let (state, store) = sqlite_state(config_in(&dir), None).await;
    assert_eq!(store.count().await.unwrap(), 1);

    let (_, json) = call(&state, compose_req("anchor")).await;
    assert_eq!(json["context_hits"].as_array().unwrap().len(), 1);
    store.close().await;
}

#[tokio::test]
async fn e2e_generator_failure_still_composes() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Arc::new(BrokenGenerator::new());
    let (state, store) = sqlite_state(config_in(&dir), Some(generator.clone())).await;

    call(&state, write_req("hello world", json!([]))).await;
    let (status, json) = call(&state, compose_req("hello")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(generator.calls(), 1);
    assert!(json["output"].is_null());
    assert!(json["prompt"].as_str().unwrap().contains("hello world"));

    store.close().await;
}

#[tokio::test]
async fn e2e_auth_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(&dir);
    config.gateway.auth_token = Some("secret1".into());
    let (state, store) = sqlite_state(config, None).await;

    let (status, _) = call(&state, write_req("x", json!([]))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(store.count().await.unwrap(), 0);

    let mut req = write_req("x", json!([]));
    req.headers_mut()
        .insert(oathlink_gateway::AUTH_HEADER, "secret1".parse().unwrap());
    let (status, _) = call(&state, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(store.count().await.unwrap(), 1);

    store.close().await;
}

#[tokio::test]
async fn e2e_config_file_drives_store_and_compose() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("nested").join("oath.db");
    let config_path = dir.path().join("oathlink.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[memory]
db_path = "{}"
default_limit = 2

[compose]
persona = "You are the e2e persona."
placeholder = "NOTHING FOUND"
"#,
            db.display().to_string().replace('\\', "/")
        ),
    )
    .unwrap();

    let config = AppConfig::load_from(&config_path).unwrap();
    let (state, store) = sqlite_state(config, None).await;
    assert!(db.exists());

    let (_, json) = call(&state, compose_req("nothing stored yet")).await;
    assert_eq!(json["prompt_parts"]["system"], "You are the e2e persona.");
    assert!(json["prompt"].as_str().unwrap().contains("NOTHING FOUND"));

    for n in 0..3 {
        call(&state, write_req(&format!("note {n}"), json!([]))).await;
    }
    let (_, json) = call(&state, compose_req("note")).await;
    assert_eq!(json["context_hits"].as_array().unwrap().len(), 2);

    store.close().await;
}

#[tokio::test]
async fn e2e_composer_reads_persona_from_store() {
    use oathlink_core::settings::{PERSONA_KEY, SettingsStore};

    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let store = open_store(&config).await.unwrap();
    store
        .put_setting(PERSONA_KEY, &json!("Persona from the settings table."))
        .await
        .unwrap();

    let composer = oathlink_gateway::build_composer(&config, store.clone(), None);
    let outcome = composer.compose("hi", &[], 5).await.unwrap();
    assert!(outcome.prompt.starts_with("Persona from the settings table."));
    assert!(outcome.generated_output.is_none());

    let template = oathlink_compose::PromptTemplate::from_config(&config.compose);
    assert!(outcome.user_block.ends_with(&template.trailing_instruction));

    store.close().await;
}
