//! Generator trait — the optional text-generation collaborator.
//!
//! Compose hands the persona and the assembled user block to a generator and
//! attaches whatever comes back. A failing generator never fails Compose; the
//! trait still returns a `Result` so callers decide that explicitly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// The two prompt halves sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Persona / system instruction
    pub system: String,

    /// Input, retrieved context, and trailing instruction
    pub user: String,
}

#[async_trait]
pub trait Generator: Send + Sync {
    /// A human-readable name for this generator (e.g., "openai").
    fn name(&self) -> &str;

    /// The model that will answer.
    fn model(&self) -> &str;

    /// Produce text for the request.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}
