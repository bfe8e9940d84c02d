//! `oathlink serve` — Start the HTTP API server.

use std::path::Path;

pub async fn run(config: Option<&Path>, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("🔗 OathLink Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Store:     {}", config.memory.db_path);
    println!("   Auth:      {}", if config.auth_enabled() { "X-Auth-Token required" } else { "open" });

    oathlink_gateway::start(config).await?;

    Ok(())
}
