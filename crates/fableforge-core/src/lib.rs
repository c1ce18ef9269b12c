//! Fableforge Core — shared abstractions.
//!
//! This crate defines the error taxonomy, clock abstraction, and runtime
//! configuration that every other crate depends on. It contains no
//! infrastructure code.

pub mod clock;
pub mod config;
pub mod error;
