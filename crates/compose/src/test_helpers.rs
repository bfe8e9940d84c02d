//! Shared test helpers for composer tests.

use oathlink_core::error::GenerationError;
use oathlink_core::generation::{GenerationRequest, Generator};
use std::sync::Mutex;

enum Behavior {
    Reply(String),
    Fail,
    Hang,
}

/// A scripted generator that records the last request it received.
pub struct MockGenerator {
    behavior: Behavior,
    last: Mutex<Option<GenerationRequest>>,
}

impl MockGenerator {
    fn with(behavior: Behavior) -> Self {
        Self {
            behavior,
            last: Mutex::new(None),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::with(Behavior::Reply(text.into()))
    }

    pub fn failing() -> Self {
        Self::with(Behavior::Fail)
    }

    /// Never answers; only a timeout ends the call.
    pub fn hanging() -> Self {
        Self::with(Behavior::Hang)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Generator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        *self.last.lock().unwrap() = Some(request);
        match &self.behavior {
            Behavior::Reply(text) => Ok(text.clone()),
            Behavior::Fail => Err(GenerationError::Network("connection refused".into())),
            Behavior::Hang => {
                std::future::pending::<()>().await;
                Err(GenerationError::EmptyResponse)
            }
        }
    }
}
