//! Fableforge API — the HTTP and SSE surface of the session engine.
//!
//! The server holds no game state of its own; every handler forwards to
//! the session coordinator through its command handle and translates the
//! engine's errors into HTTP statuses.

pub mod error;
pub mod routes;
pub mod state;
