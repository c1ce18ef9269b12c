//! Fableforge Session — the orchestration core.
//!
//! One coordinator task owns the world state for a session. Incoming
//! participant requests flow through the turn controller (who may act
//! right now?) and the action resolution pipeline (what happens, and how
//! does the world change?), with every intermediate step fanned out to
//! listeners through the broadcast hub.

pub mod compactor;
pub mod controller;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod schemas;

pub use compactor::ContextCompactor;
pub use controller::TurnController;
pub use orchestrator::{Session, SessionHandle};
pub use pipeline::{ActionPipeline, Resolution};
pub use schemas::{
    ActionOutcome, AfterAction, ClassifiedRequest, CorrectionList, DeltaInstruction, DeltaTarget,
    GeneratedCharacter, GeneratedScene, RequestKind, TurnShuffle, WorldChange,
    WorldChangeKind,
};
