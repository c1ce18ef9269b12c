//! The structured generation service interface.
//!
//! Target types describe their own JSON shape via [`PromptSchema`]; the
//! schema is embedded in the prompt and the response parsed strictly.
//! Failure is always surfaced — a missing or malformed response is never
//! treated as success.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors from the generation service.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The request did not complete (network, timeout, HTTP error).
    #[error("generation request failed: {0}")]
    RequestFailed(String),

    /// The service answered, but the payload was unusable.
    #[error("invalid generation response: {0}")]
    InvalidResponse(String),

    /// The service answered with nothing at all.
    #[error("empty generation response")]
    Empty,
}

/// An opaque, fallible service converting prompts into text or JSON.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Free-text completion.
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Structured completion: the returned value is a single JSON object
    /// already isolated from any surrounding prose.
    async fn generate_json(&self, prompt: &str) -> Result<serde_json::Value, GenerationError>;
}

/// A type the generation service can produce.
pub trait PromptSchema: DeserializeOwned {
    /// Schema name quoted in prompts.
    const NAME: &'static str;

    /// A JSON description of the expected shape, embedded verbatim in the
    /// prompt.
    fn schema() -> serde_json::Value;
}

/// Builds the standard schema-conformance prompt around a request.
#[must_use]
pub fn schema_prompt(
    schema_name: &str,
    schema: &serde_json::Value,
    request: &str,
    language: &str,
) -> String {
    format!(
        "You are a data generation assistant. Your task is to create a JSON \
         object that strictly adheres to the provided `{schema_name}` schema.\n\n\
         JSON Schema:\n{schema}\n\n\
         Request:\n{request}\n\n\
         All generated text content MUST be in the following language: {language}.\n\
         IMPORTANT: Your response MUST be ONLY the valid JSON object that \
         conforms to the schema. Do not include any other text, explanations, \
         or markdown formatting."
    )
}

/// Asks the service for a typed object.
///
/// # Errors
///
/// Returns [`GenerationError`] when the request fails or the response does
/// not parse into `T`.
pub async fn generate_object<T: PromptSchema>(
    service: &dyn GenerationService,
    request: &str,
    language: &str,
) -> Result<T, GenerationError> {
    let prompt = schema_prompt(T::NAME, &T::schema(), request, language);
    let value = service.generate_json(&prompt).await?;
    serde_json::from_value(value)
        .map_err(|e| GenerationError::InvalidResponse(format!("{} did not parse: {e}", T::NAME)))
}

/// Isolates the outermost JSON object in a raw completion, tolerating
/// markdown fences and prose around it.
///
/// # Errors
///
/// Returns [`GenerationError::InvalidResponse`] when no JSON object is
/// present.
pub fn extract_json(raw: &str) -> Result<serde_json::Value, GenerationError> {
    let start = raw
        .find('{')
        .ok_or_else(|| GenerationError::InvalidResponse("no JSON object in response".into()))?;
    let end = raw
        .rfind('}')
        .ok_or_else(|| GenerationError::InvalidResponse("no JSON object in response".into()))?;
    serde_json::from_str(&raw[start..=end])
        .map_err(|e| GenerationError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_strips_fences_and_prose() {
        let raw = "Sure, here you go:\n```json\n{\"ok\": true}\n```";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn test_extract_json_rejects_plain_prose() {
        assert!(extract_json("no structure here").is_err());
    }

    #[test]
    fn test_schema_prompt_names_schema_and_language() {
        let prompt = schema_prompt(
            "ActionOutcome",
            &serde_json::json!({"narrative": "string"}),
            "describe the hit",
            "English",
        );
        assert!(prompt.contains("`ActionOutcome`"));
        assert!(prompt.contains("language: English"));
        assert!(prompt.contains("describe the hit"));
    }
}
