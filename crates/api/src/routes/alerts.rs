//! Alert log and broadcast handlers.

use axum::{extract::State, Extension, Json};
use domain::models::Alert;
use domain::services::{BroadcastReceipt, BroadcastRequest, SessionContext, WindowQuery};
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_broadcast;

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub alerts: Vec<Alert>,
}

/// Latest broadcast alerts.
///
/// GET /api/v1/admin/alerts
pub async fn list_alerts(State(state): State<AppState>) -> Result<Json<AlertsResponse>, ApiError> {
    let limit = state.dashboards.limits().list_limit;
    let alerts = state.store.list_alerts(WindowQuery::latest(limit)).await?;
    Ok(Json(AlertsResponse { alerts }))
}

/// Send an alert to every subscriber.
///
/// POST /api/v1/admin/broadcast
///
/// A delivery failure is returned with the platform's message unchanged
/// and nothing is added to the alert log.
pub async fn broadcast(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(request): Json<BroadcastRequest>,
) -> Result<Json<BroadcastReceipt>, ApiError> {
    match state.broadcaster.broadcast(&session, request).await {
        Ok(receipt) => {
            record_broadcast("sent");
            Ok(Json(receipt))
        }
        Err(e) => {
            record_broadcast("failed");
            Err(e.into())
        }
    }
}
