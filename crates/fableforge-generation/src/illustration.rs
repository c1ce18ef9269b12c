//! Out-of-band illustration rendering.
//!
//! Portraits and scene art are nice-to-haves: requests are queued to a
//! background worker, and a failed render is logged and forgotten rather
//! than surfaced to the session.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use tokio::sync::mpsc;

use fableforge_broadcast::{BroadcastHub, StreamEvent};

use crate::service::GenerationError;

/// What an illustration depicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllustrationKind {
    Character,
    Scene,
}

impl IllustrationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Character => "CHARACTER",
            Self::Scene => "SCENE",
        }
    }
}

/// A queued render request.
#[derive(Debug, Clone)]
pub struct IllustrationRequest {
    /// Entity name, used for the output filename and the stream event.
    pub name: String,
    /// Visual description fed to the image backend.
    pub description: String,
    pub kind: IllustrationKind,
}

/// Produces raw image bytes for a textual description.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    async fn render(&self, description: &str) -> Result<Vec<u8>, GenerationError>;
}

/// Image backend speaking an OpenAI-compatible images endpoint.
///
/// The endpoint returns base64-encoded image data, which is decoded here
/// so the worker only ever handles raw bytes.
#[derive(Debug, Clone)]
pub struct HttpImageBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl HttpImageBackend {
    #[must_use]
    pub fn new(base_url: &str, model: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            model: model.to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: String,
}

#[async_trait]
impl ImageBackend for HttpImageBackend {
    async fn render(&self, description: &str) -> Result<Vec<u8>, GenerationError> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": description,
            "response_format": "b64_json",
        });
        let response = self
            .client
            .post(format!("{}/v1/images/generations", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(GenerationError::RequestFailed(format!(
                "image endpoint returned {}",
                response.status()
            )));
        }
        let parsed: ImageResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        let datum = parsed.data.into_iter().next().ok_or(GenerationError::Empty)?;
        BASE64
            .decode(datum.b64_json.as_bytes())
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))
    }
}

/// Handle for queueing illustration work to the background worker.
#[derive(Debug, Clone)]
pub struct IllustrationGenerator {
    tx: mpsc::UnboundedSender<IllustrationRequest>,
}

impl IllustrationGenerator {
    /// Spawns the render worker and returns its handle.
    ///
    /// Finished images land in `output_dir`; each completion is announced
    /// on `hub` as an `Illustration` event. Render and write failures are
    /// logged and dropped.
    pub fn spawn(
        backend: Arc<dyn ImageBackend>,
        hub: Arc<BroadcastHub>,
        output_dir: PathBuf,
    ) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<IllustrationRequest>();
        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                match backend.render(&request.description).await {
                    Ok(bytes) => {
                        let filename = format!("{}.png", sanitize_filename(&request.name));
                        let path = output_dir.join(&filename);
                        if let Err(error) = tokio::fs::create_dir_all(&output_dir).await {
                            tracing::warn!(%error, "failed to create illustration directory");
                            continue;
                        }
                        if let Err(error) = tokio::fs::write(&path, &bytes).await {
                            tracing::warn!(%error, name = %request.name, "failed to write illustration");
                            continue;
                        }
                        hub.publish(&StreamEvent::Illustration {
                            name: request.name,
                            path: path.to_string_lossy().into_owned(),
                            kind: request.kind.as_str().to_owned(),
                        });
                    }
                    Err(error) => {
                        tracing::warn!(%error, name = %request.name, "illustration render failed");
                    }
                }
            }
        });
        Self { tx }
    }

    /// Queues a render. A closed worker means shutdown; the request is
    /// silently dropped.
    pub fn enqueue(&self, request: IllustrationRequest) {
        if self.tx.send(request).is_err() {
            tracing::debug!("illustration worker gone, dropping request");
        }
    }
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedBackend(Vec<u8>);

    #[async_trait]
    impl ImageBackend for FixedBackend {
        async fn render(&self, _description: &str) -> Result<Vec<u8>, GenerationError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Sir Reginald III"), "sir_reginald_iii");
    }

    #[tokio::test]
    async fn test_completed_render_is_announced() {
        let dir = std::env::temp_dir().join(format!("fableforge-art-{}", std::process::id()));
        let hub = Arc::new(BroadcastHub::new(10));
        let queue = hub.register("l1", "Thorin");

        let generator = IllustrationGenerator::spawn(
            Arc::new(FixedBackend(vec![1, 2, 3])),
            Arc::clone(&hub),
            dir.clone(),
        );
        // Skip the join announcement from register.
        let _ = queue.recv().await;

        generator.enqueue(IllustrationRequest {
            name: "Thorin".to_owned(),
            description: "a dour dwarf".to_owned(),
            kind: IllustrationKind::Character,
        });

        match queue.recv().await {
            StreamEvent::Illustration { name, kind, path } => {
                assert_eq!(name, "Thorin");
                assert_eq!(kind, "CHARACTER");
                assert!(path.ends_with("thorin.png"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
