//! Shared application state.

use std::time::Duration;

use fableforge_session::SessionHandle;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Command handle to the session coordinator.
    pub session: SessionHandle,
    /// Idle interval after which the SSE stream emits a keep-alive.
    pub keepalive_interval: Duration,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(session: SessionHandle, keepalive_interval: Duration) -> Self {
        Self {
            session,
            keepalive_interval,
        }
    }
}
