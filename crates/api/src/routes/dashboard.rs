//! Dashboard handlers.

use axum::{extract::State, Json};
use domain::services::views::{AdminDashboard, UserDashboard};

use crate::app::AppState;
use crate::error::ApiError;

/// Recent incident count, open incidents and open SOS requests.
///
/// GET /api/v1/admin/dashboard
pub async fn admin_dashboard(
    State(state): State<AppState>,
) -> Result<Json<AdminDashboard>, ApiError> {
    Ok(Json(state.dashboards.admin_dashboard().await?))
}

/// The most recent open incidents.
///
/// GET /api/v1/dashboard/user
pub async fn user_dashboard(
    State(state): State<AppState>,
) -> Result<Json<UserDashboard>, ApiError> {
    Ok(Json(state.dashboards.user_dashboard().await?))
}
