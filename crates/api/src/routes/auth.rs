//! Login and logout handlers.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use domain::models::user::{LoginRequest, LoginResponse};
use domain::services::session;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;

/// Sign in with roll number and password.
///
/// POST /api/v1/auth/login
///
/// Sets the session marker cookies and tells the client where to go next.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    request.validate()?;

    let (account, roll) = session::authenticate(state.users.as_ref(), &request).await?;

    let mut storage = state.cookies.read_session(&headers);
    let context = session::establish(&mut storage, &account, &roll);

    let mut response = Json(LoginResponse {
        role: context.role,
        redirect_to: context.role.landing_page().to_string(),
    })
    .into_response();
    storage.apply(response.headers_mut());

    Ok(response)
}

/// Sign out and return to the login page.
///
/// POST /api/v1/auth/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut storage = state.cookies.read_session(&headers);
    session::clear(&mut storage);

    let mut response = (
        StatusCode::SEE_OTHER,
        [(header::LOCATION, state.guard.login_page().to_string())],
    )
        .into_response();
    storage.apply(response.headers_mut());

    tracing::info!("Session cleared");
    response
}
