//! Shared test mocks and utilities for the Fableforge engine.

mod clock;
mod fixtures;
mod generator;

pub use clock::FixedClock;
pub use fixtures::{drain, test_world};
pub use generator::ScriptedGenerator;
