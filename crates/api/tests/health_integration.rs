//! Integration tests for health endpoints.

mod common;

use axum::http::StatusCode;
use common::*;
use tower::ServiceExt;

#[tokio::test]
async fn test_health_check_with_memory_store() {
    let app = TestApp::new();

    let response = app
        .app()
        .oneshot(get_request("/api/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"]["backend"], "memory");
    assert_eq!(body["storage"]["connected"], true);
    assert_eq!(body["push_enabled"], false);
}

#[tokio::test]
async fn test_liveness_endpoint() {
    let app = TestApp::new();

    let response = app
        .app()
        .oneshot(get_request("/api/health/live", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn test_readiness_endpoint() {
    let app = TestApp::new();

    let response = app
        .app()
        .oneshot(get_request("/api/health/ready", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = TestApp::new();

    let response = app
        .app()
        .oneshot(get_request("/api/health/live", None))
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}
