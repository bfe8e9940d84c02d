//! The composer — search, render, optionally generate.

use oathlink_core::error::{GenerationError, OathError};
use oathlink_core::generation::{GenerationRequest, Generator};
use oathlink_core::memory::{MemoryRecord, MemorySearch};
use oathlink_core::settings::{self, SettingsStore};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::template::PromptTemplate;

/// Result of one compose call.
#[derive(Debug, Clone, Serialize)]
pub struct ComposeOutcome {
    /// Persona followed by the user block
    pub prompt: String,
    /// The persona actually used (system half)
    pub persona: String,
    /// Input, context, and trailing instruction (user half)
    pub user_block: String,
    /// The query that was searched
    pub query: String,
    /// Memories placed in the context block
    pub hits: Vec<MemoryRecord>,
    /// Generator output, when a generator ran and succeeded
    pub generated_output: Option<String>,
    /// Model that produced `generated_output`
    pub model_used: Option<String>,
}

/// Stateless apart from its injected collaborators; share it behind an `Arc`.
pub struct Composer {
    search: Arc<dyn MemorySearch>,
    settings: Option<Arc<dyn SettingsStore>>,
    generator: Option<Arc<dyn Generator>>,
    template: PromptTemplate,
    generation_timeout: Duration,
}

impl Composer {
    pub fn new(search: Arc<dyn MemorySearch>, template: PromptTemplate) -> Self {
        Self {
            search,
            settings: None,
            generator: None,
            template,
            generation_timeout: Duration::from_secs(30),
        }
    }

    /// Read the persona from a settings store before falling back to the
    /// template's.
    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Attach a generator. `None` leaves generation disabled.
    pub fn with_generator(mut self, generator: Option<Arc<dyn Generator>>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Compose a prompt for `input`.
    ///
    /// Fails only when the search fails (bad `limit` or storage fault).
    pub async fn compose(
        &self,
        input: &str,
        tags: &[String],
        limit: usize,
    ) -> Result<ComposeOutcome, OathError> {
        let query = PromptTemplate::build_query(input, tags);
        let hits = self.search.search(&query, limit).await?;
        debug!(hits = hits.len(), limit, "Compose: search complete");

        let context = self.template.render_context(&hits);
        let user_block = self.template.render_user_block(input, &context);
        let persona = self.persona().await;
        let prompt = PromptTemplate::render_prompt(&persona, &user_block);

        let (generated_output, model_used) = match self.generate(&persona, &user_block).await {
            Some(Ok((text, model))) => (Some(text), Some(model)),
            Some(Err(e)) => {
                // Generation is best-effort: the caller still gets the prompt.
                warn!(error = %e, "Generation failed; returning composed prompt only");
                (None, None)
            }
            None => (None, None),
        };

        info!(
            hits = hits.len(),
            prompt_len = prompt.len(),
            generated = generated_output.is_some(),
            "Compose complete"
        );

        Ok(ComposeOutcome {
            prompt,
            persona,
            user_block,
            query,
            hits,
            generated_output,
            model_used,
        })
    }

    /// Stored persona if present and readable, else the template default.
    async fn persona(&self) -> String {
        let Some(store) = &self.settings else {
            return self.template.persona.clone();
        };

        match store.get_setting(settings::PERSONA_KEY).await {
            Ok(Some(value)) => match settings::persona_text(&value) {
                Some(text) => text.to_string(),
                None => {
                    warn!("Stored persona has no usable text; using configured persona");
                    self.template.persona.clone()
                }
            },
            Ok(None) => self.template.persona.clone(),
            Err(e) => {
                warn!(error = %e, "Persona setting unreadable; using configured persona");
                self.template.persona.clone()
            }
        }
    }

    /// `None` when no generator is attached.
    async fn generate(
        &self,
        persona: &str,
        user_block: &str,
    ) -> Option<Result<(String, String), GenerationError>> {
        let generator = self.generator.as_ref()?;
        let request = GenerationRequest {
            system: persona.to_string(),
            user: user_block.to_string(),
        };

        let result = tokio::time::timeout(self.generation_timeout, generator.generate(request))
            .await
            .unwrap_or(Err(GenerationError::Timeout(self.generation_timeout)));

        Some(result.map(|text| (text, generator.model().to_string())))
    }
}
