//! Fableforge World — the mutable scene, character roster, turn order, and
//! running narrative logs for one session.
//!
//! Nothing in this crate is concurrent. The store is owned and mutated
//! exclusively by the session coordinator; every other component reads
//! snapshots or requests mutations through the action pipeline.

pub mod character;
pub mod log;
pub mod scene;
pub mod state;
pub mod turn;

pub use character::{Ability, Character, Item, ItemKind, Rarity};
pub use log::{AuditRecord, ChatMessage, EventLog, MessageHistory, NarrativeContext};
pub use scene::{Scene, SceneObject};
pub use state::WorldState;
pub use turn::{GameMode, TurnOrder};
