//! `oathlink doctor` — Diagnose system health.

use oathlink_config::{AppConfig, DEFAULT_CONFIG_FILE};
use oathlink_core::memory::MemoryStore;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 OathLink Doctor — System Diagnostics");
    println!("========================================\n");

    let mut issues = 0;

    // Check config
    let explicit = config_path.is_some() || std::env::var_os("OATHLINK_CONFIG").is_some();
    if !explicit && !Path::new(DEFAULT_CONFIG_FILE).exists() {
        println!("  ⚠️  No {DEFAULT_CONFIG_FILE} found — running on defaults");
    }

    let config = match AppConfig::load(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. Fix the config before the remaining checks.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ Provider API key configured ({})", config.provider.model);
    } else {
        println!("  ⚠️  No provider API key — compose returns prompts only");
    }

    if config.auth_enabled() {
        println!("  ✅ Auth token configured");
    } else {
        println!("  ⚠️  No auth token — the gateway accepts every request");
        issues += 1;
    }

    // Check store
    match oathlink_gateway::open_store(&config).await {
        Ok(store) => {
            match store.count().await {
                Ok(n) => println!("  ✅ Store reachable at {} ({n} memories)", store.path().display()),
                Err(e) => {
                    println!("  ❌ Store opened but unreadable: {e}");
                    issues += 1;
                }
            }
            store.close().await;
        }
        Err(e) => {
            println!("  ❌ Cannot open store at {}: {e}", config.memory.db_path);
            issues += 1;
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
