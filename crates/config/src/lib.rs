//! Configuration loading, validation, and management for OathLink.
//!
//! Loads configuration from `oathlink.toml` (or the path in
//! `OATHLINK_CONFIG`) with environment variable overrides. Validates all
//! settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "oathlink.toml";

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Memory store configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Prompt composition
    #[serde(default)]
    pub compose: ComposeConfig,

    /// Optional text-generation provider
    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Largest `limit` accepted by search and compose
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Limit used when the caller gives none
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Upper bound on any single store access
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> String {
    "data/memory.db".into()
}
fn default_max_limit() -> usize {
    100
}
fn default_limit() -> usize {
    5
}
fn default_timeout_ms() -> u64 {
    5_000
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_limit: default_max_limit(),
            default_limit: default_limit(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Shared secret expected in `X-Auth-Token`. `None` disables the check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            auth_token: None,
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl GatewayConfig {
    /// The configured shared secret. An empty string counts as none.
    pub fn token(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|t| !t.is_empty())
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("port", &self.port)
            .field("host", &self.host)
            .field("auth_token", &redact(&self.auth_token))
            .field("body_limit_bytes", &self.body_limit_bytes)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeConfig {
    /// Persona used when the settings store has none
    #[serde(default = "default_persona")]
    pub persona: String,

    /// Context text when nothing matched
    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    /// Final instruction appended after the context block
    #[serde(default = "default_trailing_instruction")]
    pub trailing_instruction: String,
}

fn default_persona() -> String {
    "You are OathLink, a steady and candid assistant. Answer in the user's language, \
     stay consistent with the remembered context, and never invent memories."
        .into()
}
fn default_placeholder() -> String {
    "(no matching memory)".into()
}
fn default_trailing_instruction() -> String {
    "Answer the input using the context above where it is relevant.".into()
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            persona: default_persona(),
            placeholder: default_placeholder(),
            trailing_instruction: default_trailing_instruction(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key; generation is disabled when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Hard bound on one generation call
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_provider_timeout() -> u64 {
    30
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from `path`, or from `OATHLINK_CONFIG`, or from
    /// `./oathlink.toml`, then apply environment overrides:
    ///
    /// - `DB_PATH` → `memory.db_path`
    /// - `AUTH_TOKEN` → `gateway.auth_token` (empty string disables auth)
    /// - `PORT` → `gateway.port`
    /// - `OATHLINK_API_KEY`, then `OPENAI_API_KEY` → `provider.api_key`
    /// - `OATHLINK_MODEL` → `provider.model`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("OATHLINK_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if config.gateway.token().is_none() {
            config.gateway.auth_token = None;
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(db_path) = lookup("DB_PATH") {
            self.memory.db_path = db_path;
        }

        if let Some(token) = lookup("AUTH_TOKEN") {
            self.gateway.auth_token = if token.is_empty() { None } else { Some(token) };
        }

        if let Some(port) = lookup("PORT") {
            self.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("PORT is not a valid port: {port}"))
            })?;
        }

        if self.provider.api_key.is_none() {
            self.provider.api_key = lookup("OATHLINK_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(model) = lookup("OATHLINK_MODEL") {
            self.provider.model = model;
        }

        Ok(())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.memory.max_limit == 0 {
            return Err(ConfigError::ValidationError(
                "memory.max_limit must be at least 1".into(),
            ));
        }

        if self.memory.default_limit == 0 || self.memory.default_limit > self.memory.max_limit {
            return Err(ConfigError::ValidationError(
                "memory.default_limit must be between 1 and memory.max_limit".into(),
            ));
        }

        if self.memory.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "memory.timeout_ms must be > 0".into(),
            ));
        }

        if self.compose.placeholder.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "compose.placeholder must not be empty".into(),
            ));
        }

        if self.provider.temperature < 0.0 || self.provider.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "provider.timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Is shared-secret auth enforced?
    pub fn auth_enabled(&self) -> bool {
        self.gateway.token().is_some()
    }

    /// Is a generation provider configured?
    pub fn has_api_key(&self) -> bool {
        self.provider.api_key.is_some()
    }

    /// Render as TOML with secrets removed (for `oathlink config`).
    pub fn redacted_toml(&self) -> String {
        let mut config = self.clone();
        config.gateway.auth_token = config.gateway.auth_token.map(|_| "[REDACTED]".into());
        config.provider.api_key = config.provider.api_key.map(|_| "[REDACTED]".into());
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
