//! Engine error taxonomy.

use thiserror::Error;

/// Top-level error type for the session engine.
///
/// No variant is fatal to the session coordinator: the worst outcome for
/// any single failure is that one change does not apply and listeners are
/// told why.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A participant submitted a request outside their combat turn.
    #[error("not your turn: {character} acted while {active} holds the turn")]
    NotYourTurn {
        /// The character that tried to act.
        character: String,
        /// The character that currently holds the turn.
        active: String,
    },

    /// A delta or lookup referenced an entity the roster does not contain.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// The structured generation service failed or returned an unusable
    /// response. The affected change is skipped, never assumed.
    #[error("generation failed: {0}")]
    Generation(String),

    /// A delta violated the relative/scoped contract before any
    /// generation call was made.
    #[error("validation error: {0}")]
    Validation(String),

    /// The session coordinator has shut down and no longer accepts
    /// commands.
    #[error("session closed")]
    SessionClosed,
}

impl EngineError {
    /// True for errors that are reported to the requester only rather
    /// than broadcast to every listener.
    #[must_use]
    pub fn is_private(&self) -> bool {
        matches!(self, Self::NotYourTurn { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_your_turn_message_names_both_characters() {
        let err = EngineError::NotYourTurn {
            character: "Igor".into(),
            active: "Oleg".into(),
        };
        let text = err.to_string();
        assert!(text.contains("Igor"));
        assert!(text.contains("Oleg"));
    }

    #[test]
    fn test_only_authorization_errors_are_private() {
        assert!(
            EngineError::NotYourTurn {
                character: "a".into(),
                active: "b".into(),
            }
            .is_private()
        );
        assert!(!EngineError::UnknownEntity("ghost".into()).is_private());
        assert!(!EngineError::Generation("timeout".into()).is_private());
    }
}
