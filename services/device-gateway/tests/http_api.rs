//! Integration tests for the gateway router
//!
//! Requests go through the real axum router backed by an in-memory ledger.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use device_gateway::{router, AppState};
use device_ledger::{Config, Ledger};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt; // for oneshot

async fn test_app(legacy_error_status: bool) -> (Router, Arc<Ledger>) {
    let ledger = Arc::new(Ledger::open(Config::in_memory()).await.unwrap());
    let app = router(AppState::new(ledger.clone(), legacy_error_status));
    (app, ledger)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_device_flow_legacy_status() {
    let (app, ledger) = test_app(true).await;

    let (status, body) = post(&app, "/register", json!({"esp32id": "D1", "Status": "Active"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Device Registered");

    let (status, body) = post(&app, "/register", json!({"esp32id": "D1", "Status": "Active"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "The device D1 already exists");

    let (_, body) = post(&app, "/auth", json!({"esp32id": "D1"})).await;
    assert_eq!(body, "Device Authenticated");

    let (_, body) = post(&app, "/update", json!({"esp32id": "D1", "Status": "Inactive"})).await;
    assert_eq!(body, "Device Status Updated");

    let (status, body) = post(&app, "/auth", json!({"esp32id": "D1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "The device D1 is blacklisted");

    let (_, body) = post(&app, "/delete", json!({"esp32id": "D1"})).await;
    assert_eq!(body, "Device Deleted");

    let (status, body) = post(&app, "/auth", json!({"esp32id": "D1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "The device D1 does not exist");

    ledger.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_getall_returns_ledger_json() {
    let (app, ledger) = test_app(true).await;
    ledger.init_ledger().await.unwrap();

    post(&app, "/register", json!({"esp32id": "D2", "Status": "Active"})).await;
    post(&app, "/register", json!({"esp32id": "D1", "Status": "Active"})).await;

    let (status, body) = get(&app, "/getall").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        r#"[{"ID":null,"Status":null,"docType":"device"},{"ID":"D1","Status":"Active"},{"ID":"D2","Status":"Active"}]"#
    );

    ledger.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_strict_status_mapping() {
    let (app, ledger) = test_app(false).await;

    let (status, body) = post(&app, "/update", json!({"esp32id": "D9", "Status": "Active"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "The device D9 does not exist");

    post(&app, "/register", json!({"esp32id": "D9", "Status": "Inactive"})).await;
    let (status, _) = post(&app, "/register", json!({"esp32id": "D9", "Status": "Active"})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = post(&app, "/auth", json!({"esp32id": "D9"})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = post(&app, "/delete", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    ledger.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_missing_id_is_relayed() {
    let (app, ledger) = test_app(true).await;

    let (status, body) = post(&app, "/register", json!({"Status": "Active"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Invalid argument: device ID must not be empty");

    ledger.shutdown().await.unwrap();
}

async fn post_raw(
    app: &Router,
    uri: &str,
    content_type: Option<&str>,
    body: &str,
) -> (StatusCode, String) {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}

#[tokio::test]
async fn test_body_without_json_content_type_reads_as_empty() {
    let (app, ledger) = test_app(true).await;
    ledger.register_device("D1", "Active").await.unwrap();

    let (status, body) = post_raw(&app, "/auth", None, r#"{"esp32id":"D1"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Invalid argument: device ID must not be empty");

    let (status, body) = post_raw(&app, "/register", Some("text/plain"), "D2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Invalid argument: device ID must not be empty");
    assert!(!ledger.device_exists("D2").await.unwrap());

    ledger.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unreadable_body_legacy_status() {
    let (app, ledger) = test_app(true).await;

    let (status, body) = post_raw(&app, "/register", Some("application/json"), "{not json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.is_empty());

    let (status, body) = post_raw(
        &app,
        "/update",
        Some("application/json"),
        r#"{"esp32id":"D1","Status":7}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.is_empty());

    ledger.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unreadable_body_strict_status() {
    let (app, ledger) = test_app(false).await;

    let (status, _) = post_raw(&app, "/delete", Some("application/json"), "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_raw(
        &app,
        "/update",
        Some("application/json"),
        r#"{"esp32id":"D1","Status":7}"#,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Missing content type still reaches the contract
    let (status, body) = post_raw(&app, "/auth", None, "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Invalid argument: device ID must not be empty");

    ledger.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_health_and_metrics() {
    let (app, ledger) = test_app(true).await;
    post(&app, "/register", json!({"esp32id": "D1", "Status": "Active"})).await;

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["ledger_backend"], "memory");
    assert_eq!(health["state_digest"], ledger.state_digest().unwrap());

    let (status, body) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("gateway_http_requests_total"));
    assert!(body.contains("ledger_transactions_total"));

    ledger.shutdown().await.unwrap();
}
