pub mod compose;
pub mod config_cmd;
pub mod doctor;
pub mod memory;
pub mod serve;
pub mod settings;

use oathlink_config::AppConfig;
use std::path::Path;
use tracing::debug;

/// Load config the same way for every command.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, String> {
    debug!(path = ?path, "Loading config");
    AppConfig::load(path).map_err(|e| format!("Failed to load config: {e}"))
}
