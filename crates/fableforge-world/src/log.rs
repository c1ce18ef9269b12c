//! Narrative context, audit log, and chat history.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Accumulating free-text memory fed back into every generation request.
///
/// Sections are appended inside XML-ish tags so the generation service can
/// tell action logs from entity updates. The compactor keeps the whole
/// thing bounded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NarrativeContext {
    text: String,
}

impl NarrativeContext {
    /// Starts a context from an opening premise.
    #[must_use]
    pub fn new(premise: &str) -> Self {
        Self {
            text: premise.to_owned(),
        }
    }

    /// Appends a tagged section.
    pub fn append_section(&mut self, tag: &str, body: &str) {
        self.text.push_str(&format!("\n<{tag}>\n{body}\n</{tag}>\n"));
    }

    /// Replaces the whole context with a compacted summary.
    pub fn replace(&mut self, summary: String) {
        self.text = summary;
    }

    /// The raw text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in characters, the compaction trigger metric.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// True for an empty context.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Whitespace-separated word count, the compaction budget metric.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// One structured audit record: who did what and the resulting change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// When the record was written.
    pub occurred_at: DateTime<Utc>,
    /// Record kind, e.g. `action_outcome` or `character_update_failure`.
    pub kind: String,
    /// Arbitrary structured details.
    pub details: serde_json::Value,
}

/// Append-only, most-recent-N audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    records: VecDeque<AuditRecord>,
    capacity: usize,
}

impl EventLog {
    /// Creates a log retaining at most `capacity` records.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::new(),
            capacity,
        }
    }

    /// Appends a record, evicting the oldest past capacity.
    pub fn record(&mut self, occurred_at: DateTime<Utc>, kind: &str, details: serde_json::Value) {
        self.records.push_back(AuditRecord {
            occurred_at,
            kind: kind.to_owned(),
            details,
        });
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }
    }

    /// The most recent `n` records, oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<&AuditRecord> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip).collect()
    }

    /// Number of retained records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// One chat transcript line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who said it: a character name, "DM", or "system".
    pub sender: String,
    /// The message text.
    pub text: String,
}

/// Most-recent-N chat transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageHistory {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl MessageHistory {
    /// Creates a history retaining at most `capacity` messages.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            capacity,
        }
    }

    /// Appends a message, evicting the oldest past capacity.
    pub fn push(&mut self, sender: &str, text: &str) {
        self.messages.push_back(ChatMessage {
            sender: sender.to_owned(),
            text: text.to_owned(),
        });
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
    }

    /// The last `n` messages from a given sender, joined by newlines.
    /// Feeds the "avoid repeating yourself" prompt memory.
    #[must_use]
    pub fn last_from(&self, sender: &str, n: usize) -> String {
        let lines: Vec<&str> = self
            .messages
            .iter()
            .filter(|message| message.sender == sender)
            .map(|message| message.text.as_str())
            .collect();
        let skip = lines.len().saturating_sub(n);
        lines[skip..].join("\n")
    }

    /// All retained messages, oldest first.
    #[must_use]
    pub fn all(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }
}
