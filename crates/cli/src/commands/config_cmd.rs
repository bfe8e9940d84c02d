//! `oathlink config` — Show the effective configuration.

use std::path::Path;

pub fn show(config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config)?;

    println!("# Effective configuration (secrets redacted)");
    println!("{}", config.redacted_toml());
    Ok(())
}
