//! Read-only game state endpoints.

use axum::extract::State;
use axum::{Json, Router, routing::get};

use fableforge_world::Character;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/game_state
async fn game_state(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    Ok(Json(state.session.snapshot().await?))
}

/// GET /api/active_character
///
/// `null` outside combat, or when the turn order is empty.
async fn active_character(
    State(state): State<AppState>,
) -> Result<Json<Option<Character>>, ApiError> {
    Ok(Json(state.session.active_character().await?))
}

/// Returns the router for the read-only state surface.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/game_state", get(game_state))
        .route("/active_character", get(active_character))
}
