//! OpenAI-compatible generator.
//!
//! Works with OpenAI, OpenRouter, Ollama, vLLM and anything else exposing
//! `/chat/completions`. Only non-streaming completions are used: the persona
//! goes in as the system message, the composed block as the user message.

use async_trait::async_trait;
use oathlink_config::ProviderConfig;
use oathlink_core::error::GenerationError;
use oathlink_core::generation::{GenerationRequest, Generator};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// A generator backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiCompatGenerator {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiCompatGenerator {
    /// Create a new generator. `timeout` bounds the whole HTTP exchange.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: 1024,
            client,
        })
    }

    /// Create from the `[provider]` config section.
    pub fn from_config(config: &ProviderConfig, api_key: &str) -> Result<Self, GenerationError> {
        let mut generator = Self::new(
            &config.api_url,
            api_key,
            &config.model,
            Duration::from_secs(config.timeout_secs),
        )?;
        generator.temperature = config.temperature;
        generator.max_tokens = config.max_tokens;
        Ok(generator)
    }

    fn request_body(&self, request: &GenerationRequest) -> ApiRequest {
        ApiRequest {
            model: self.model.clone(),
            messages: vec![
                ApiMessage {
                    role: "system".into(),
                    content: Some(request.system.clone()),
                },
                ApiMessage {
                    role: "user".into(),
                    content: Some(request.user.clone()),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        }
    }

    /// Pull the first non-empty choice out of a completion response.
    fn extract_text(response: ApiResponse) -> Result<String, GenerationError> {
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }
}

#[async_trait]
impl Generator for OpenAiCompatGenerator {
    fn name(&self) -> &str {
        "openai_compat"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request);

        debug!(model = %self.model, user_len = request.user.len(), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(GenerationError::Api {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| GenerationError::Api {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        Self::extract_text(api_response)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}
