//! Text-generation providers for OathLink.
//!
//! All providers implement the `oathlink_core::Generator` trait. Generation
//! is optional: [`build_from_config`] returns `None` when no API key is
//! configured, and Compose then returns the prompt alone.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatGenerator;

use oathlink_config::AppConfig;
use oathlink_core::Generator;
use std::sync::Arc;
use tracing::{info, warn};

/// Build the configured generator, if any.
pub fn build_from_config(config: &AppConfig) -> Option<Arc<dyn Generator>> {
    let Some(api_key) = config.provider.api_key.as_deref() else {
        info!("No provider API key configured; generation disabled");
        return None;
    };

    match OpenAiCompatGenerator::from_config(&config.provider, api_key) {
        Ok(generator) => {
            info!(
                model = %generator.model(),
                api_url = %config.provider.api_url,
                "Generation provider ready"
            );
            Some(Arc::new(generator))
        }
        Err(e) => {
            warn!(error = %e, "Generation provider unavailable; continuing without it");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_key_means_no_generator() {
        let config = AppConfig::default();
        assert!(build_from_config(&config).is_none());
    }

    #[test]
    fn key_builds_generator() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("sk-test".into());
        config.provider.model = "gpt-test".into();

        let generator = build_from_config(&config).unwrap();
        assert_eq!(generator.name(), "openai_compat");
        assert_eq!(generator.model(), "gpt-test");
    }
}
