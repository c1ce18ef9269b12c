//! Character roster endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::delete, routing::post};
use serde::Deserialize;
use tracing::{info, instrument};

use fableforge_world::Character;

use crate::error::ApiError;
use crate::routes::session::StatusResponse;
use crate::state::AppState;

/// Request body for POST /api/characters.
#[derive(Debug, Deserialize)]
pub struct CreateCharacterRequest {
    /// Free-text description the character is generated from.
    pub description: String,
}

/// POST /api/characters
#[instrument(skip(state, request))]
async fn create_character(
    State(state): State<AppState>,
    Json(request): Json<CreateCharacterRequest>,
) -> Result<(StatusCode, Json<Character>), ApiError> {
    info!("handling create_character");
    let character = state.session.create_character(&request.description).await?;
    Ok((StatusCode::CREATED, Json(character)))
}

/// DELETE /api/characters/{name}
#[instrument(skip(state))]
async fn remove_character(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    info!(character = %name, "handling remove_character");
    state.session.remove_character(&name).await?;
    Ok(Json(StatusResponse { status: "ok" }))
}

/// Returns the router for the roster surface.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_character))
        .route("/{name}", delete(remove_character))
}
