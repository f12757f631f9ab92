//! Integration tests for the HTTP surface.
//!
//! Tests drive the Axum `Router` directly via `tower::ServiceExt` without
//! starting a TCP server.

#![allow(clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use castaway_core::config::CastawayConfig;
use castaway_server::router::build_router;
use castaway_server::state::AppState;
use serde_json::Value;
use tower::ServiceExt;

fn make_state(static_dir: &str) -> Arc<AppState> {
    let mut config = CastawayConfig::default();
    config.server.static_dir = static_dir.to_owned();
    Arc::new(AppState::new(&config))
}

/// A fresh directory holding a single `index.html`.
fn static_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "castaway-static-{label}-{}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("index.html"), "<h1>castaway</h1>").unwrap();
    dir
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(state: Arc<AppState>, uri: &str) -> axum::response::Response {
    build_router(state)
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn sessions_list_is_empty_at_start() {
    let state = make_state("missing");
    let response = get(state, "/api/sessions").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response.into_body()).await, Value::Array(vec![]));
}

#[tokio::test]
async fn sessions_list_shows_created_sessions_in_name_order() {
    let state = make_state("missing");
    state.registry.find_or_create("raft").await;
    state.registry.find_or_create("main").await;

    let response = get(Arc::clone(&state), "/api/sessions").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|entry| entry["name"].as_str())
        .collect();
    assert_eq!(names, vec!["main", "raft"]);
    assert!(json[0]["created_at"].is_string());
}

#[tokio::test]
async fn single_session_lookup() {
    let state = make_state("missing");
    state.registry.find_or_create("main").await;

    let found = get(Arc::clone(&state), "/api/sessions/main").await;
    assert_eq!(found.status(), StatusCode::OK);
    assert_eq!(body_to_json(found.into_body()).await["name"], "main");

    let missing = get(Arc::clone(&state), "/api/sessions/nowhere").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(missing.into_body()).await;
    assert_eq!(json["status"], 404);
    assert!(json["error"].as_str().unwrap().contains("nowhere"));

    // Lookups never create sessions.
    assert!(state.registry.get("nowhere").await.is_none());
}

#[tokio::test]
async fn join_without_upgrade_is_rejected() {
    let state = make_state("missing");
    let response = get(Arc::clone(&state), "/join?name=alice&game=main").await;

    assert!(response.status().is_client_error());
    assert!(state.registry.list().await.is_empty());
}

#[tokio::test]
async fn static_files_are_served_for_other_paths() {
    let dir = static_dir("index");
    let state = make_state(dir.to_str().unwrap());

    let index = get(Arc::clone(&state), "/").await;
    assert_eq!(index.status(), StatusCode::OK);
    let content_type = index.headers().get(header::CONTENT_TYPE).unwrap();
    assert!(content_type.to_str().unwrap().starts_with("text/html"));

    let missing = get(state, "/nope.js").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}
