//! Webhook HTTP API tests
//!
//! Updates are posted through the router with `oneshot`; the handler runs on
//! a tracked task, so each test drains the tracker before checking replies.

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use helpers::FakeTransport;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sightbot_gateway::{build_router, AppState, EchoHandler};
use std::sync::Arc;
use tower::ServiceExt;

const TOKEN: &str = "123456:test-token";

fn setup() -> (AppState, Arc<FakeTransport>) {
    let transport = Arc::new(FakeTransport::new());
    let state = AppState::new(Arc::new(EchoHandler::new(transport.clone())), TOKEN);
    (state, transport)
}

fn post_update(path: &str, update: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(update.to_string()))
        .unwrap()
}

async fn drain(state: &AppState) {
    state.tasks.close();
    state.tasks.wait().await;
}

#[tokio::test]
async fn test_update_acknowledged_and_handled() {
    let (state, transport) = setup();
    let app = build_router(state.clone());

    let update = json!({
        "update_id": 1,
        "message": {"message_id": 5, "chat": {"id": 99, "type": "private"}, "text": "ping"}
    });
    let response = app
        .oneshot(post_update(&format!("/{}/", TOKEN), update))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    drain(&state).await;
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].chat_id, 99);
    assert_eq!(sent[0].text, "Your original message: ping");
}

#[tokio::test]
async fn test_wrong_token_rejected() {
    let (state, transport) = setup();
    let app = build_router(state.clone());

    let update = json!({
        "update_id": 2,
        "message": {"message_id": 5, "chat": {"id": 99}, "text": "ping"}
    });
    let response = app.oneshot(post_update("/not-the-token/", update)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    drain(&state).await;
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_wrong_token_with_bad_body_is_still_404() {
    let (state, _) = setup();

    let request = Request::builder()
        .method("POST")
        .uri("/not-the-token/")
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let response = build_router(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let request = Request::builder()
        .method("POST")
        .uri(format!("/{}/", TOKEN))
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let response = build_router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_without_message_ignored() {
    let (state, transport) = setup();
    let app = build_router(state.clone());

    let update = json!({"update_id": 3, "my_chat_member": {"chat": {"id": 1}}});
    let response = app
        .oneshot(post_update(&format!("/{}/", TOKEN), update))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    drain(&state).await;
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_health_endpoint() {
    let (state, _) = setup();
    let app = build_router(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "sightbot-gateway");
    assert!(body["version"].is_string());
}
