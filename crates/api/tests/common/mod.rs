//! Common test utilities for integration tests.
//!
//! Tests drive the router in-process against the in-memory store and the
//! mock push gateway, so no database or network is needed.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request},
    Router,
};
use campuscare_api::{
    app::{create_app, AppState},
    config::Config,
};
use domain::models::UserAccount;
use domain::services::{InMemoryStore, MockPushGateway};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

pub const ADMIN_ROLL: &str = "ADM001";
pub const ADMIN_PASSWORD: &str = "admin-secret";
pub const USER_ROLL: &str = "21CS042";
pub const USER_PASSWORD: &str = "user-secret";

/// Create a test configuration.
pub fn test_config() -> Config {
    Config::load_for_test(&[]).expect("Failed to load test config")
}

/// A router plus handles on its store and push gateway.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub push: Arc<MockPushGateway>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_parts(InMemoryStore::new(), MockPushGateway::new())
    }

    pub fn with_parts(store: InMemoryStore, push: MockPushGateway) -> Self {
        let store = Arc::new(store);
        let push = Arc::new(push);
        seed_accounts(&store);

        let state = AppState::new(test_config(), store.clone(), push.clone(), None);
        Self {
            router: create_app(state),
            store,
            push,
        }
    }

    /// A fresh handle on the router for one `oneshot` call.
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

fn account(roll: &str, password: &str, account_type: &str) -> UserAccount {
    UserAccount {
        id: Uuid::new_v4(),
        roll_no: roll.to_string(),
        password_hash: shared::password::hash_password(password).expect("Failed to hash password"),
        account_type: Some(account_type.to_string()),
    }
}

/// Seeds one admin and one regular account.
pub fn seed_accounts(store: &InMemoryStore) {
    store.seed_user(account(ADMIN_ROLL, ADMIN_PASSWORD, "admin"));
    store.seed_user(account(USER_ROLL, USER_PASSWORD, "student"));
}

/// Cookie header of a signed-in admin.
pub fn admin_cookie() -> String {
    format!(
        "campuscareRole=admin; campuscareLoggedInAt=1700000000000; campuscareRoll={}",
        ADMIN_ROLL
    )
}

/// Cookie header of a signed-in user.
pub fn user_cookie() -> String {
    format!(
        "campuscareRole=user; campuscareLoggedInAt=1700000000000; campuscareRoll={}",
        USER_ROLL
    )
}

/// Build a JSON request with an optional session cookie.
pub fn json_request(method: Method, uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a bodyless GET request with an optional session cookie.
pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Parse JSON response body.
pub async fn parse_response_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

/// All `Set-Cookie` values of a response.
pub fn set_cookies(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .collect()
}

/// Turns `Set-Cookie` values into a `Cookie` request header.
pub fn cookie_header(set_cookies: &[String]) -> String {
    set_cookies
        .iter()
        .filter_map(|c| c.split(';').next())
        .filter(|pair| !pair.ends_with('='))
        .collect::<Vec<_>>()
        .join("; ")
}
