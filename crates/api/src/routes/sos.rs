//! SOS endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use domain::models::incident::UpdateStatusRequest;
use domain::models::sos_request::TriggerSosRequest;
use domain::models::SosRequest;
use domain::services::views::{sos_page_rows, SosPageRow};
use domain::services::{SessionContext, TransitionOutcome, WindowQuery};
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{record_sos_triggered, record_status_transition};

#[derive(Debug, Serialize)]
pub struct SosListResponse {
    pub requests: Vec<SosPageRow>,
}

/// Result of an SOS status change.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum SosTransitionResponse {
    Applied { request: SosRequest },
    /// Another update of the same request was still being written.
    Skipped { message: String },
}

/// Raise an SOS from the user dashboard.
///
/// POST /api/v1/sos
pub async fn trigger_sos(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(request): Json<TriggerSosRequest>,
) -> Result<(StatusCode, Json<SosRequest>), ApiError> {
    let sos = state.intake.trigger_sos(&session, request).await?;
    record_sos_triggered();
    Ok((StatusCode::CREATED, Json(sos)))
}

/// Latest SOS requests, highest sequence id first.
///
/// GET /api/v1/admin/sos
pub async fn list_sos_requests(
    State(state): State<AppState>,
) -> Result<Json<SosListResponse>, ApiError> {
    let limit = state.dashboards.limits().list_limit;
    let requests = state.store.list_sos(WindowQuery::latest(limit)).await?;
    Ok(Json(SosListResponse {
        requests: sos_page_rows(&requests),
    }))
}

/// Move an SOS request to a new status.
///
/// PATCH /api/v1/admin/sos/:id/status
///
/// Returns 409 when an update for the same request is already in flight.
pub async fn update_sos_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Response, ApiError> {
    match state.lifecycle.transition_sos(id, &request.status).await? {
        TransitionOutcome::Applied(sos) => {
            record_status_transition("sos", &sos.status);
            Ok(Json(SosTransitionResponse::Applied { request: sos }).into_response())
        }
        TransitionOutcome::Skipped => Ok((
            StatusCode::CONFLICT,
            Json(SosTransitionResponse::Skipped {
                message: "An update for this SOS request is already in progress".to_string(),
            }),
        )
            .into_response()),
    }
}
