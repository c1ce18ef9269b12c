//! HTTP generation client (OpenAI-compatible chat completions API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::service::{GenerationError, GenerationService, extract_json};

/// Default base URL, a local Ollama instance.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default model name.
pub const DEFAULT_MODEL: &str = "llama3.1";

/// Timeout for generation requests; they can be slow.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct HttpGenerationService {
    client: Client,
    base_url: String,
    model: String,
}

impl HttpGenerationService {
    /// Creates a client against `base_url` using `model`.
    #[must_use]
    pub fn new(base_url: &str, model: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            model: model.to_owned(),
        }
    }

    /// Creates a client from `FABLEFORGE_GENERATION_BASE_URL` and
    /// `FABLEFORGE_GENERATION_MODEL`, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = std::env::var("FABLEFORGE_GENERATION_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        let model = std::env::var("FABLEFORGE_GENERATION_MODEL")
            .unwrap_or_else(|_| DEFAULT_MODEL.to_owned());
        Self::new(&base_url, &model)
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_owned(),
                content: prompt.to_owned(),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .map_err(|e| GenerationError::RequestFailed(e.to_string()))?;
            return Err(GenerationError::RequestFailed(error_text));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(GenerationError::Empty)?;
        if content.trim().is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(content)
    }
}

impl Default for HttpGenerationService {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_MODEL)
    }
}

#[async_trait]
impl GenerationService for HttpGenerationService {
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
        self.complete(prompt).await
    }

    async fn generate_json(&self, prompt: &str) -> Result<serde_json::Value, GenerationError> {
        let raw = self.complete(prompt).await?;
        extract_json(&raw)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = HttpGenerationService::new("http://localhost:11434/", "m");
        assert_eq!(client.base_url, "http://localhost:11434");
    }
}
