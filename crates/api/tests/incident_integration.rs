//! Integration tests for incident reporting and the admin status flow.

mod common;

use axum::http::{Method, StatusCode};
use common::*;
use domain::services::intake::MISSING_REPORT_FIELDS;
use domain::services::push::PushTarget;
use domain::services::Collection;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn report(app: &TestApp, body: Value) -> Value {
    let response = app
        .app()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/incidents",
            body,
            Some(&user_cookie()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    parse_response_body(response).await
}

async fn set_status(app: &TestApp, id: &str, status: &str) -> axum::response::Response {
    app.app()
        .oneshot(json_request(
            Method::PATCH,
            &format!("/api/v1/admin/incidents/{}/status", id),
            json!({ "status": status }),
            Some(&admin_cookie()),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_report_issue_numbers_incidents() {
    let app = TestApp::new();

    let first = report(
        &app,
        json!({"type": "Maintenance", "description": "Leaking tap", "location": "Block A"}),
    )
    .await;
    assert_eq!(first["incidentId"], "10001");
    assert_eq!(first["status"], "pending");
    assert_eq!(first["type"], "Maintenance");
    assert_eq!(first["reportedBy"], USER_ROLL);

    let second = report(
        &app,
        json!({"description": "Broken window", "location": "Library"}),
    )
    .await;
    assert_eq!(second["incidentId"], "10002");
    assert_eq!(second["type"], "Other");
}

#[tokio::test]
async fn test_report_issue_missing_fields_writes_nothing() {
    let app = TestApp::new();

    let response = app
        .app()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/incidents",
            json!({"type": "Safety", "description": "   ", "location": "Hostel"}),
            Some(&user_cookie()),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["message"], MISSING_REPORT_FIELDS);
    assert_eq!(app.store.write_count(Collection::Incidents), 0);
}

#[tokio::test]
async fn test_user_incident_list_filters() {
    let app = TestApp::new();
    let first = report(&app, json!({"description": "One", "location": "A"})).await;
    report(&app, json!({"description": "Two", "location": "B"})).await;

    let id = first["id"].as_str().unwrap();
    assert_eq!(set_status(&app, id, "resolved").await.status(), StatusCode::OK);

    let response = app
        .app()
        .oneshot(get_request("/api/v1/incidents?filter=resolved", Some(&user_cookie())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["filter"], "resolved");
    let incidents = body["incidents"].as_array().unwrap();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0]["description"], "One");

    let response = app
        .app()
        .oneshot(get_request("/api/v1/incidents?filter=active", Some(&user_cookie())))
        .await
        .unwrap();
    let body = parse_response_body(response).await;
    let incidents = body["incidents"].as_array().unwrap();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0]["description"], "Two");

    let response = app
        .app()
        .oneshot(get_request("/api/v1/incidents", Some(&user_cookie())))
        .await
        .unwrap();
    let body = parse_response_body(response).await;
    assert_eq!(body["filter"], "all");
    assert_eq!(body["incidents"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_user_incident_list_rejects_unknown_filter() {
    let app = TestApp::new();

    let response = app
        .app()
        .oneshot(get_request("/api/v1/incidents?filter=closed", Some(&user_cookie())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_incident_detail() {
    let app = TestApp::new();
    let created = report(&app, json!({"description": "Flooded hall", "location": "C"})).await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .app()
        .oneshot(get_request(
            &format!("/api/v1/incidents/{}", id),
            Some(&user_cookie()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .app()
        .oneshot(get_request(
            &format!("/api/v1/incidents/{}", uuid::Uuid::new_v4()),
            Some(&user_cookie()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_status_transitions() {
    let app = TestApp::new();
    let created = report(&app, json!({"description": "Power cut", "location": "Lab 3"})).await;
    let id = created["id"].as_str().unwrap();

    let response = set_status(&app, id, "ongoing").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "ongoing");
    assert!(body["ongoingAt"].is_string());

    let response = set_status(&app, id, "resolved").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "resolved");
    assert!(body["resolvedAt"].is_string());

    let response = app
        .app()
        .oneshot(get_request("/api/v1/admin/incidents", Some(&admin_cookie())))
        .await
        .unwrap();
    let body = parse_response_body(response).await;
    assert_eq!(body["incidents"][0]["status"], "resolved");
}

#[tokio::test]
async fn test_admin_status_rejects_unknown_status() {
    let app = TestApp::new();
    let created = report(&app, json!({"description": "Noise", "location": "D"})).await;
    let id = created["id"].as_str().unwrap();

    let response = set_status(&app, id, "archived").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_resolving_notifies_reporter() {
    let app = TestApp::new();

    let response = app
        .app()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/push/register",
            json!({"token": "reporter-token"}),
            Some(&user_cookie()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let created = report(&app, json!({"description": "Fallen tree", "location": "Gate 2"})).await;
    let id = created["id"].as_str().unwrap();

    assert_eq!(set_status(&app, id, "resolved").await.status(), StatusCode::OK);

    let sent = app.push.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, PushTarget::Token("reporter-token".to_string()));
    assert_eq!(sent[0].1.title, "Your incident was resolved");
    assert_eq!(app.store.write_count(Collection::Notifications), 1);

    // Every resolve write notifies again
    assert_eq!(set_status(&app, id, "resolved").await.status(), StatusCode::OK);
    assert_eq!(app.push.sent().len(), 2);
    assert_eq!(app.store.write_count(Collection::Notifications), 2);
}

#[tokio::test]
async fn test_failed_status_write_reports_previous_status() {
    let app = TestApp::new();
    let created = report(&app, json!({"description": "Gas smell", "location": "Canteen"})).await;
    let id = created["id"].as_str().unwrap();

    app.store.fail_writes(Collection::Incidents);

    let response = set_status(&app, id, "ongoing").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "transition_failed");
    assert_eq!(body["previousStatus"], "pending");
}

#[tokio::test]
async fn test_user_dashboard() {
    let app = TestApp::new();
    report(&app, json!({"description": "Dim lights", "location": "Parking"})).await;

    let response = app
        .app()
        .oneshot(get_request("/api/v1/dashboard/user", Some(&user_cookie())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
