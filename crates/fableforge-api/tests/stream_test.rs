//! Integration tests for the SSE stream endpoint.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use fableforge_test_support::ScriptedGenerator;
use tower::ServiceExt;

#[tokio::test]
async fn test_stream_connects_as_event_stream() {
    let app = common::build_test_app(ScriptedGenerator::default());

    let request = Request::builder()
        .method("GET")
        .uri("/stream?name=Igor")
        .body(Body::empty())
        .unwrap();

    // The body is an infinite stream; only the handshake is checked here.
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("text/event-stream"));
}
