//! Session guard middleware.
//!
//! Reads the session markers from the request cookies and admits the
//! request only when the role marker matches. Otherwise the caller is
//! redirected to the login page before any handler runs.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::models::Role;

use crate::app::AppState;
use crate::error::ApiError;

async fn require_role(state: &AppState, role: Role, mut req: Request<Body>, next: Next) -> Response {
    let storage = state.cookies.read_session(req.headers());
    match state.guard.require(&storage, role) {
        Ok(session) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Requires an admin session.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    require_role(&state, Role::Admin, req, next).await
}

/// Requires a user session.
pub async fn require_user(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    require_role(&state, Role::User, req, next).await
}
