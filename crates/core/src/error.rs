//! Error types for the OathLink domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Callers only ever see the three kinds in [`OathError`]; the generation
//! collaborator has its own enum because its failures are swallowed.

use std::time::Duration;
use thiserror::Error;

/// The caller-visible error type for every OathLink operation.
#[derive(Debug, Error)]
pub enum OathError {
    /// Bad caller input: empty content, out-of-range limit, bad setting key.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or incorrect shared-secret credential.
    #[error("Unauthorized: {0}")]
    Auth(String),

    /// The durable store is unavailable, slow, or corrupted.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl OathError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Stable machine-readable name, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Auth(_) => "auth_error",
            Self::Storage(_) => "storage_error",
        }
    }

    /// Storage faults are infrastructure problems the caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, OathError>;

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Failed to open store: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("Generator not configured: {0}")]
    NotConfigured(String),

    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Generator returned no text")]
    EmptyResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_converts_and_displays() {
        let err: OathError = StorageError::Timeout {
            operation: "INSERT".into(),
            timeout_ms: 5000,
        }
        .into();
        assert_eq!(err.kind(), "storage_error");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("5000ms"));
    }

    #[test]
    fn validation_is_not_retryable() {
        let err = OathError::validation("content must not be empty");
        assert_eq!(err.kind(), "validation_error");
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("content must not be empty"));
    }

    #[test]
    fn generation_error_displays_status() {
        let err = GenerationError::Api {
            status_code: 429,
            message: "Too many requests".into(),
        };
        assert!(err.to_string().contains("429"));
    }

    #[test]
    fn generation_timeout_keeps_sub_second_precision() {
        let err = GenerationError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Generation timed out after 250ms");
    }
}
