//! Turn order and game mode.

use serde::{Deserialize, Serialize};

/// Session-wide mode gating who may act and how strictly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
    /// Strict turn order; only the active character may act.
    Combat,
    /// Open floor; any living player character may act.
    Narrative,
}

impl GameMode {
    /// Wire name of the mode, as sent in `lock` events.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Combat => "COMBAT",
            Self::Narrative => "NARRATIVE",
        }
    }
}

/// Cyclic sequence of character names with a current index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOrder {
    order: Vec<String>,
    current: usize,
}

impl TurnOrder {
    /// Builds a turn order from character names.
    #[must_use]
    pub fn new(order: Vec<String>) -> Self {
        Self { order, current: 0 }
    }

    /// Name of the character whose turn it is, or `None` on an empty
    /// order.
    #[must_use]
    pub fn active(&self) -> Option<&str> {
        self.order.get(self.current).map(String::as_str)
    }

    /// Moves to the next entry, wrapping past the end.
    pub fn advance(&mut self) {
        if !self.order.is_empty() {
            self.current = (self.current + 1) % self.order.len();
        }
    }

    /// Replaces the whole order and resets the index.
    pub fn reset(&mut self, order: Vec<String>) {
        self.order = order;
        self.current = 0;
    }

    /// Appends a character to the end of the order.
    pub fn push(&mut self, name: String) {
        self.order.push(name);
    }

    /// Renames every matching entry in place, keeping the index.
    pub fn rename(&mut self, old: &str, new: &str) {
        for entry in &mut self.order {
            if entry == old {
                new.clone_into(entry);
            }
        }
    }

    /// Removes every entry not present in `roster`, keeping the active
    /// index on the same character where possible.
    pub fn prune(&mut self, roster: &[String]) {
        let active = self.active().map(str::to_owned);
        self.order.retain(|name| roster.contains(name));
        self.current = active
            .and_then(|name| self.order.iter().position(|entry| *entry == name))
            .unwrap_or(0);
        if self.order.is_empty() {
            self.current = 0;
        } else {
            self.current %= self.order.len();
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when no characters are in the order.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The names in order, for prompts and snapshots.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.order
    }
}
