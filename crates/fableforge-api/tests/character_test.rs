//! Integration tests for the roster endpoints.

mod common;

use axum::http::StatusCode;
use fableforge_test_support::ScriptedGenerator;
use serde_json::json;

#[tokio::test]
async fn test_create_character_returns_201_with_generated_character() {
    let service = ScriptedGenerator::default();
    service.push_json(json!({
        "name": "Mira",
        "max_health": 22,
        "current_health": 22,
        "defense": 14,
        "appearance": "a weathered ranger",
    }));
    let app = common::build_test_app(service);

    let (status, body) = common::post_json(
        app,
        "/api/characters",
        &json!({ "description": "a weathered ranger" }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Mira");
    assert_eq!(body["is_player"], true);
    assert_eq!(body["alive"], true);
}

#[tokio::test]
async fn test_create_character_with_failing_generation_returns_502() {
    let service = ScriptedGenerator::default();
    service.push_error("model offline");
    let app = common::build_test_app(service);

    let (status, body) = common::post_json(
        app,
        "/api/characters",
        &json!({ "description": "a weathered ranger" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "generation_error");
}

#[tokio::test]
async fn test_remove_character_returns_ok() {
    let app = common::build_test_app(ScriptedGenerator::default());

    let (status, body) = common::delete_json(app, "/api/characters/Ent").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_remove_unknown_character_returns_404() {
    let app = common::build_test_app(ScriptedGenerator::default());

    let (status, body) = common::delete_json(app, "/api/characters/Nobody").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "unknown_entity");
}
