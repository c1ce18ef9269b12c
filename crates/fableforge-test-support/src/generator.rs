//! Scripted generation service for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use fableforge_generation::{GenerationError, GenerationService};

enum Scripted {
    Json(serde_json::Value),
    Text(String),
    Error(String),
}

/// A generation service that replays a scripted sequence of responses in
/// FIFO order, one per call. An exhausted script fails every further
/// call, so a test that makes more generation calls than it scripted
/// fails loudly instead of silently succeeding.
#[derive(Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Scripted>>,
}

impl ScriptedGenerator {
    /// Queues a structured response.
    pub fn push_json(&self, value: serde_json::Value) {
        self.push(Scripted::Json(value));
    }

    /// Queues a free-text response.
    pub fn push_text(&self, text: &str) {
        self.push(Scripted::Text(text.to_owned()));
    }

    /// Queues a failure.
    pub fn push_error(&self, message: &str) {
        self.push(Scripted::Error(message.to_owned()));
    }

    fn push(&self, response: Scripted) {
        self.responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(response);
    }

    fn pop(&self) -> Option<Scripted> {
        self.responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
    }
}

#[async_trait]
impl GenerationService for ScriptedGenerator {
    async fn generate_text(&self, _prompt: &str) -> Result<String, GenerationError> {
        match self.pop() {
            Some(Scripted::Text(text)) => Ok(text),
            Some(Scripted::Json(value)) => Ok(value.to_string()),
            Some(Scripted::Error(message)) => Err(GenerationError::RequestFailed(message)),
            None => Err(GenerationError::Empty),
        }
    }

    async fn generate_json(&self, _prompt: &str) -> Result<serde_json::Value, GenerationError> {
        match self.pop() {
            Some(Scripted::Json(value)) => Ok(value),
            Some(Scripted::Text(text)) => {
                Err(GenerationError::InvalidResponse(format!("not JSON: {text}")))
            }
            Some(Scripted::Error(message)) => Err(GenerationError::RequestFailed(message)),
            None => Err(GenerationError::Empty),
        }
    }
}
