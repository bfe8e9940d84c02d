//! `oathlink settings` — Stored key/value settings.

use oathlink_core::settings::{self, SettingsStore};
use serde_json::Value;
use std::path::Path;

pub async fn get(config: Option<&Path>, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    settings::validate_key(key)?;
    let config = super::load_config(config)?;
    let store = oathlink_gateway::open_store(&config).await?;

    let result = store.get_setting(key).await;
    store.close().await;

    match result? {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => println!("   (no setting named '{key}')"),
    }
    Ok(())
}

pub async fn set(config: Option<&Path>, key: &str, raw: &str) -> Result<(), Box<dyn std::error::Error>> {
    settings::validate_key(key)?;
    let config = super::load_config(config)?;
    let store = oathlink_gateway::open_store(&config).await?;

    let value = parse_value(raw);
    let result = store.put_setting(key, &value).await;
    store.close().await;
    result?;

    println!("✅ Set {key}");
    Ok(())
}

/// JSON when it parses, otherwise the raw text as a JSON string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
