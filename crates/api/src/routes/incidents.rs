//! Incident endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use domain::models::incident::{ReportIssueRequest, UpdateStatusRequest};
use domain::models::Incident;
use domain::services::views::{
    admin_incident_rows, incident_detail, user_incident_cards, AdminIncidentRow, IncidentDetail,
    UserIncidentCard,
};
use domain::services::{IncidentFilter, SessionContext, WindowQuery};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{record_incident_reported, record_status_transition};

/// Query parameters for the user incident list.
#[derive(Debug, Deserialize)]
pub struct IncidentListQuery {
    pub filter: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIncidentsResponse {
    pub filter: IncidentFilter,
    pub incidents: Vec<UserIncidentCard>,
}

#[derive(Debug, Serialize)]
pub struct AdminIncidentsResponse {
    pub incidents: Vec<AdminIncidentRow>,
}

/// Report a new incident.
///
/// POST /api/v1/incidents
pub async fn report_issue(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(request): Json<ReportIssueRequest>,
) -> Result<(StatusCode, Json<Incident>), ApiError> {
    let incident = state.intake.report_issue(&session, request).await?;
    record_incident_reported();
    Ok((StatusCode::CREATED, Json(incident)))
}

/// List incidents as cards, optionally filtered by status.
///
/// GET /api/v1/incidents?filter=all|active|ongoing|resolved
pub async fn list_user_incidents(
    State(state): State<AppState>,
    Query(query): Query<IncidentListQuery>,
) -> Result<Json<UserIncidentsResponse>, ApiError> {
    let filter: IncidentFilter = query
        .filter
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(ApiError::Validation)?;

    let incidents = state.store.list_incidents(WindowQuery::all()).await?;

    Ok(Json(UserIncidentsResponse {
        filter,
        incidents: user_incident_cards(&incidents, filter),
    }))
}

/// Incident detail with its status history.
///
/// GET /api/v1/incidents/:id
pub async fn get_incident_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<IncidentDetail>, ApiError> {
    let incident = state
        .store
        .get_incident(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Incident {} not found", id)))?;

    Ok(Json(incident_detail(&incident)))
}

/// Every incident, newest first.
///
/// GET /api/v1/admin/incidents
pub async fn list_admin_incidents(
    State(state): State<AppState>,
) -> Result<Json<AdminIncidentsResponse>, ApiError> {
    let incidents = state.store.list_incidents(WindowQuery::all()).await?;
    Ok(Json(AdminIncidentsResponse {
        incidents: admin_incident_rows(&incidents),
    }))
}

/// Move an incident to a new status.
///
/// PATCH /api/v1/admin/incidents/:id/status
///
/// On a failed write the error body carries `previousStatus` so the
/// client can roll back its optimistic update.
pub async fn update_incident_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Incident>, ApiError> {
    let incident = state
        .lifecycle
        .transition_incident(id, &request.status)
        .await?;
    record_status_transition("incident", &incident.status);
    Ok(Json(incident))
}
