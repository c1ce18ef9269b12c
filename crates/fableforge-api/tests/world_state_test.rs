//! Integration tests for the read-only state endpoints.

mod common;

use axum::http::StatusCode;
use fableforge_test_support::ScriptedGenerator;

#[tokio::test]
async fn test_game_state_returns_full_snapshot() {
    let app = common::build_test_app(ScriptedGenerator::default());

    let (status, json) = common::get_json(app, "/api/game_state").await;

    assert_eq!(status, StatusCode::OK);
    let state = &json["game_state"];
    assert_eq!(state["game_mode"], "NARRATIVE");
    let order: Vec<&str> = state["turn_order"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(order, ["Igor", "Olga", "Ent"]);
    assert!(state["current_scene"]["description"].is_string());
}

#[tokio::test]
async fn test_active_character_matches_turn_order_head() {
    let app = common::build_test_app(ScriptedGenerator::default());

    let (status, json) = common::get_json(app, "/api/active_character").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Igor");
    assert_eq!(json["is_player"], true);
}
