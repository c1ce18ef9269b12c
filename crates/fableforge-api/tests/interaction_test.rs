//! Integration tests for the interaction endpoint.

mod common;

use axum::http::StatusCode;
use fableforge_test_support::{ScriptedGenerator, test_world};
use fableforge_world::GameMode;
use serde_json::json;

#[tokio::test]
async fn test_interact_resolves_narrative_question() {
    let service = ScriptedGenerator::default();
    service.push_json(json!({ "request_kind": "question" }));
    service.push_json(json!({
        "narrative": "The clearing is silent except for dripping leaves.",
        "is_legal": true,
        "deltas": [],
    }));
    service.push_json(json!({ "corrections": [] }));
    service.push_json(json!({ "recommended_mode": "NARRATIVE", "world_changes": [] }));
    let app = common::build_test_app(service);

    let (status, body) = common::post_json(
        app,
        "/interact",
        &json!({ "character": "Igor", "message": "What do I see?" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_interact_out_of_turn_returns_403() {
    let mut world = test_world();
    world.mode = GameMode::Combat;
    world
        .turn_order
        .reset(vec!["Igor".to_owned(), "Olga".to_owned()]);
    let app = common::build_test_app_with_world(ScriptedGenerator::default(), world);

    let (status, body) = common::post_json(
        app,
        "/interact",
        &json!({ "character": "Olga", "message": "I strike first!" }),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not_your_turn");
}

#[tokio::test]
async fn test_interact_with_failing_generation_returns_502() {
    let service = ScriptedGenerator::default();
    service.push_error("model offline");
    let app = common::build_test_app(service);

    let (status, body) = common::post_json(
        app,
        "/interact",
        &json!({ "character": "Igor", "message": "I look around" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "generation_error");
}
