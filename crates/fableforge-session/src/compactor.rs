//! Narrative context compaction.

use std::sync::Arc;

use fableforge_core::config::EngineConfig;
use fableforge_core::error::EngineError;
use fableforge_generation::GenerationService;
use fableforge_world::WorldState;

use crate::prompts;

/// Keeps the narrative context bounded.
///
/// `compact_if_needed` is a no-op until the context grows past the
/// configured threshold, so running it after every turn is cheap and an
/// already-short context is left alone.
#[derive(Clone)]
pub struct ContextCompactor {
    service: Arc<dyn GenerationService>,
    word_budget: usize,
    threshold: usize,
}

impl ContextCompactor {
    pub fn new(service: Arc<dyn GenerationService>, config: &EngineConfig) -> Self {
        Self {
            service,
            word_budget: config.context_word_budget,
            threshold: config.context_compaction_threshold,
        }
    }

    /// True when the context has outgrown the threshold.
    #[must_use]
    pub fn needs_compaction(&self, world: &WorldState) -> bool {
        world.context.len() > self.threshold
    }

    /// Compacts the context when it exceeds the threshold.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Generation`] when the summarization call
    /// fails; the context is left unchanged in that case.
    pub async fn compact_if_needed(&self, world: &mut WorldState) -> Result<bool, EngineError> {
        if !self.needs_compaction(world) {
            return Ok(false);
        }
        self.compact(world).await?;
        Ok(true)
    }

    /// One-shot summarization of the context down to the word budget.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Generation`] on a failed or empty
    /// summarization; the context is left unchanged.
    pub async fn compact(&self, world: &mut WorldState) -> Result<(), EngineError> {
        let before_words = world.context.word_count();
        let prompt = prompts::compaction(&world.snapshot(None), self.word_budget);
        let summary = self
            .service
            .generate_text(&prompt)
            .await
            .map_err(|e| EngineError::Generation(e.to_string()))?;
        if summary.trim().is_empty() {
            return Err(EngineError::Generation(
                "compaction returned an empty summary".to_owned(),
            ));
        }
        world.context.replace(summary);
        tracing::info!(
            before_words,
            after_words = world.context.word_count(),
            "narrative context compacted"
        );
        Ok(())
    }
}
