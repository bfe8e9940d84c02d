//! Prompt template — the fixed text around the retrieved context.
//!
//! Rendering is deterministic: identical inputs always produce identical
//! prompts.

use oathlink_config::ComposeConfig;
use oathlink_core::memory::MemoryRecord;

/// Section label preceding the caller's input.
pub const INPUT_LABEL: &str = "[Input]";

/// Section label preceding the retrieved context.
pub const CONTEXT_LABEL: &str = "[Context]";

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// Persona used when no persona setting is stored
    pub persona: String,
    /// Context text when there are no hits
    pub placeholder: String,
    /// Instruction closing the user block
    pub trailing_instruction: String,
}

impl PromptTemplate {
    pub fn from_config(config: &ComposeConfig) -> Self {
        Self {
            persona: config.persona.clone(),
            placeholder: config.placeholder.clone(),
            trailing_instruction: config.trailing_instruction.clone(),
        }
    }

    /// Search query for a compose call: tags then input, space-joined and
    /// trimmed; the raw input when that comes out empty.
    pub fn build_query(input: &str, tags: &[String]) -> String {
        let joined = format!("{} {}", tags.join(" "), input);
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            input.to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// One `- content` line per hit, or the placeholder.
    pub fn render_context(&self, hits: &[MemoryRecord]) -> String {
        if hits.is_empty() {
            return self.placeholder.clone();
        }
        hits.iter()
            .map(|hit| format!("- {}", hit.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Everything after the persona: input, context, trailing instruction.
    pub fn render_user_block(&self, input: &str, context: &str) -> String {
        format!(
            "{INPUT_LABEL}\n{input}\n\n{CONTEXT_LABEL}\n{context}\n\n{}",
            self.trailing_instruction
        )
    }

    /// The final prompt: persona first, then the user block.
    pub fn render_prompt(persona: &str, user_block: &str) -> String {
        format!("{persona}\n\n{user_block}")
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::from_config(&ComposeConfig::default())
    }
}
