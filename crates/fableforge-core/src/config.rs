//! Runtime configuration.
//!
//! Every tunable the engine exposes lives here, read once from the
//! environment at startup. Defaults mirror a small table: a handful of
//! players, a bounded event stream per listener, and a context that is
//! compacted before it grows past a few thousand words.

use std::time::Duration;

/// Engine-wide configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Capacity of each listener's outbound event queue.
    pub listener_queue_capacity: usize,
    /// Idle time after which a keep-alive item is emitted to a listener.
    pub keepalive_interval: Duration,
    /// Upper bound on waiting for the active combatant's input before the
    /// turn is force-advanced.
    pub turn_timeout: Duration,
    /// Word budget the compactor summarizes the narrative context down to.
    pub context_word_budget: usize,
    /// Character count past which the narrative context is compacted.
    pub context_compaction_threshold: usize,
    /// Maximum retained audit records.
    pub event_log_capacity: usize,
    /// Maximum retained chat messages.
    pub message_history_capacity: usize,
    /// Language the generation service is instructed to answer in.
    pub language: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            listener_queue_capacity: 100,
            keepalive_interval: Duration::from_secs(5),
            turn_timeout: Duration::from_secs(120),
            context_word_budget: 3000,
            context_compaction_threshold: 10_000,
            event_log_capacity: 200,
            message_history_capacity: 100,
            language: "English".to_owned(),
        }
    }
}

impl EngineConfig {
    /// Builds a configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listener_queue_capacity: env_parse(
                "FABLEFORGE_QUEUE_CAPACITY",
                defaults.listener_queue_capacity,
            ),
            keepalive_interval: Duration::from_secs(env_parse(
                "FABLEFORGE_KEEPALIVE_SECS",
                defaults.keepalive_interval.as_secs(),
            )),
            turn_timeout: Duration::from_secs(env_parse(
                "FABLEFORGE_TURN_TIMEOUT_SECS",
                defaults.turn_timeout.as_secs(),
            )),
            context_word_budget: env_parse(
                "FABLEFORGE_CONTEXT_WORD_BUDGET",
                defaults.context_word_budget,
            ),
            context_compaction_threshold: env_parse(
                "FABLEFORGE_CONTEXT_THRESHOLD",
                defaults.context_compaction_threshold,
            ),
            event_log_capacity: env_parse(
                "FABLEFORGE_EVENT_LOG_CAPACITY",
                defaults.event_log_capacity,
            ),
            message_history_capacity: env_parse(
                "FABLEFORGE_MESSAGE_HISTORY_CAPACITY",
                defaults.message_history_capacity,
            ),
            language: std::env::var("FABLEFORGE_LANGUAGE").unwrap_or(defaults.language),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
