//! Route modules organized by surface.

pub mod characters;
pub mod health;
pub mod session;
pub mod world;
