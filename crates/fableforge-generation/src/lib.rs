//! Fableforge Generation — the external collaborators the engine consumes.
//!
//! The structured generation service turns a natural-language prompt plus
//! a target schema into a typed object; the fuzzy matcher resolves free
//! text to roster names; the illustration worker renders images out of
//! band. All three are fallible dependencies the engine treats as opaque.

pub mod client;
pub mod illustration;
pub mod matcher;
pub mod service;

pub use client::HttpGenerationService;
pub use illustration::{
    HttpImageBackend, IllustrationGenerator, IllustrationKind, IllustrationRequest, ImageBackend,
};
pub use matcher::{MatchError, closest_match};
pub use service::{GenerationError, GenerationService, PromptSchema, generate_object};
