//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use fableforge_api::routes;
use fableforge_api::state::AppState;
use fableforge_broadcast::BroadcastHub;
use fableforge_core::clock::Clock;
use fableforge_core::config::EngineConfig;
use fableforge_session::Session;
use fableforge_test_support::{FixedClock, ScriptedGenerator, test_world};
use fableforge_world::WorldState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Build the full app router around a freshly spawned session coordinator
/// with the canonical fixture world. Uses the same route structure as
/// `main.rs`.
pub fn build_test_app(service: ScriptedGenerator) -> Router {
    build_test_app_with_world(service, test_world())
}

/// Build the full app router around a custom starting world for tests
/// that need a specific mode or roster.
pub fn build_test_app_with_world(service: ScriptedGenerator, world: WorldState) -> Router {
    let config = EngineConfig::default();
    let keepalive_interval = config.keepalive_interval;
    let hub = Arc::new(BroadcastHub::new(config.listener_queue_capacity));
    let session = Session::new(
        world,
        config,
        Arc::new(service),
        fixed_clock(),
        hub,
        None,
    )
    .spawn();

    Router::new()
        .merge(routes::health::router())
        .merge(routes::session::router())
        .nest("/api", routes::world::router())
        .nest("/api/characters", routes::characters::router())
        .with_state(AppState::new(session, keepalive_interval))
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a DELETE request and return the response.
pub async fn delete_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value =
        serde_json::from_slice(&body_bytes).unwrap_or(serde_json::Value::Null);

    (status, json)
}
