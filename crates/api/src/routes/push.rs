//! Push token registration.

use axum::{extract::State, Extension, Json};
use domain::models::push_registration::RegisterTokenRequest;
use domain::services::{RegistrationReceipt, SessionContext};

use crate::app::AppState;
use crate::error::ApiError;

/// Store the caller's push token and join it to the default topic.
///
/// POST /api/v1/push/register
/// POST /api/v1/admin/push/register
pub async fn register_token(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(request): Json<RegisterTokenRequest>,
) -> Result<Json<RegistrationReceipt>, ApiError> {
    let receipt = state
        .messaging
        .register_token(&session.author(), session.role, request)
        .await?;
    Ok(Json(receipt))
}
