//! Interaction and SSE stream endpoints.

use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use axum::{Json, Router, routing::get, routing::post};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use fableforge_broadcast::{StreamItem, keepalive_stream};
use fableforge_session::SessionHandle;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /interact.
#[derive(Debug, Deserialize)]
pub struct InteractionRequest {
    /// The character the participant controls.
    pub character: String,
    /// Their free-text request.
    pub message: String,
}

/// Query parameters for GET /stream.
#[derive(Debug, Deserialize)]
pub struct StreamParams {
    /// Character name the listener follows the session as.
    pub name: Option<String>,
}

/// Response body for commands that carry no payload.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Always "ok" on success.
    pub status: &'static str,
}

/// POST /interact
#[instrument(skip(state, request), fields(character = %request.character))]
async fn interact(
    State(state): State<AppState>,
    Json(request): Json<InteractionRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    info!("handling interaction");
    state
        .session
        .interact(&request.character, &request.message)
        .await?;
    Ok(Json(StatusResponse { status: "ok" }))
}

/// Deregisters the listener when the SSE connection goes away.
struct Disconnector {
    session: SessionHandle,
    listener_id: String,
}

impl Drop for Disconnector {
    fn drop(&mut self) {
        let session = self.session.clone();
        let listener_id = self.listener_id.clone();
        tokio::spawn(async move {
            session.disconnect(&listener_id).await;
        });
    }
}

/// GET /stream?name=
///
/// Registers a listener and streams its events as SSE, interleaving
/// keep-alive comments during idle periods.
#[instrument(skip(state))]
async fn stream(
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let listener_id = Uuid::new_v4().to_string();
    let name = params.name.unwrap_or_else(|| "Unknown".to_owned());
    info!(listener_id = %listener_id, name = %name, "listener connecting");

    let queue = state.session.connect(&listener_id, &name).await?;
    let guard = Disconnector {
        session: state.session.clone(),
        listener_id,
    };
    let stream = keepalive_stream(queue, state.keepalive_interval).map(move |item| {
        let _guard = &guard;
        let event = match item {
            StreamItem::Event(event) => Event::default()
                .json_data(&event)
                .unwrap_or_else(|_| Event::default().comment("unserializable event")),
            StreamItem::KeepAlive => Event::default().comment("keepalive"),
        };
        Ok(event)
    });
    Ok(Sse::new(stream))
}

/// Returns the router for the interaction surface.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/interact", post(interact))
        .route("/stream", get(stream))
}
