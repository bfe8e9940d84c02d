//! Deployment-level settings — a tiny key-value store beside the memories.
//!
//! The composer reads its persona from here (key [`PERSONA_KEY`]); anything
//! else stored is opaque to the core.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{OathError, StorageError};

/// Settings key holding the persona descriptor.
pub const PERSONA_KEY: &str = "persona";

/// Maximum accepted key length.
pub const MAX_KEY_LEN: usize = 128;

/// Reject empty, oversized, or whitespace-padded keys.
pub fn validate_key(key: &str) -> Result<(), OathError> {
    if key.trim().is_empty() {
        return Err(OathError::validation("setting key must not be empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(OathError::validation(format!(
            "setting key longer than {MAX_KEY_LEN} bytes"
        )));
    }
    if key.trim() != key {
        return Err(OathError::validation(
            "setting key must not start or end with whitespace",
        ));
    }
    Ok(())
}

/// Extract persona text from a stored value.
///
/// Accepts either a bare JSON string or an object with a `text` field.
pub fn persona_text(value: &Value) -> Option<&str> {
    let text = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("text")?.as_str()?,
        _ => return None,
    };
    if text.trim().is_empty() { None } else { Some(text) }
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read a setting; `None` when the key was never written.
    async fn get_setting(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Write (or replace) a setting.
    async fn put_setting(&self, key: &str, value: &Value) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_validation() {
        assert!(validate_key("persona").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("  ").is_err());
        assert!(validate_key(" persona").is_err());
        assert!(validate_key(&"k".repeat(MAX_KEY_LEN + 1)).is_err());
    }

    #[test]
    fn persona_from_string_or_object() {
        assert_eq!(persona_text(&json!("Be kind.")), Some("Be kind."));
        assert_eq!(persona_text(&json!({"text": "Be brief."})), Some("Be brief."));
        assert_eq!(persona_text(&json!({"name": "x"})), None);
        assert_eq!(persona_text(&json!("   ")), None);
        assert_eq!(persona_text(&json!(42)), None);
    }
}
