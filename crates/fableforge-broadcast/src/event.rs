//! Wire event model.
//!
//! Each payload serializes as one JSON object tagged with an `event`
//! kind, matching what the web client consumes off the SSE stream.

use serde::{Deserialize, Serialize};

/// A structured event delivered to listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A narrative or chat line.
    Message {
        /// The message text.
        data: String,
        /// Character name, "DM", or "system".
        sender: String,
    },
    /// Which participants may currently act, and in which mode.
    Lock {
        /// Names allowed to submit requests right now.
        allowed_players: Vec<String>,
        /// Current game mode, `COMBAT` or `NARRATIVE`.
        game_mode: String,
    },
    /// Progress of a multi-delta action.
    Update {
        /// Human-readable description of the applied change.
        object: String,
        /// Total number of deltas in this action.
        total: usize,
        /// Index of the delta just applied, 1-based.
        current: usize,
    },
    /// A system notice.
    Alert {
        /// The notice text.
        data: String,
    },
    /// A participant connected.
    PlayerJoined {
        /// The joining participant's character name.
        name: String,
        /// All connected character names after the join.
        players: Vec<String>,
    },
    /// A participant disconnected.
    PlayerLeft {
        /// The leaving participant's character name.
        name: String,
        /// All connected character names after the leave.
        players: Vec<String>,
    },
    /// Something went wrong; the change it concerns did not apply.
    Error {
        /// What failed and why.
        data: String,
    },
    /// The acting character's turn has fully resolved.
    EndOfTurn,
    /// An illustration finished rendering out of band.
    Illustration {
        /// Entity the illustration depicts.
        name: String,
        /// Path the image was written to.
        path: String,
        /// "CHARACTER" or "SCENE".
        kind: String,
    },
}

impl StreamEvent {
    /// Convenience constructor for DM narrative lines.
    #[must_use]
    pub fn dm_message(text: &str) -> Self {
        Self::Message {
            data: text.to_owned(),
            sender: "DM".to_owned(),
        }
    }

    /// Convenience constructor for a lock that allows nobody, used while
    /// a request is being resolved.
    #[must_use]
    pub fn lock_all(game_mode: &str) -> Self {
        Self::Lock {
            allowed_players: Vec::new(),
            game_mode: game_mode.to_owned(),
        }
    }
}
