//! Live admin views over server-sent events.
//!
//! Each stream sends a `snapshot` event with the full rendered result set
//! on connect and after every change. A failed query sends one `error`
//! event and ends the stream. Disconnecting drops the subscription.

use axum::{
    extract::State,
    http::HeaderMap,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use chrono::Utc;
use domain::services::views::{
    admin_incident_rows, dashboard_active_sos, dashboard_ongoing_incidents, sos_page_rows,
};
use domain::services::{SessionError, Subscription};
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use tokio_util::sync::CancellationToken;

use crate::app::AppState;
use crate::error::ApiError;

/// Payload of the recent-incidents counter stream.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentIncidentCount {
    pub count: usize,
}

fn snapshot_stream<T, R, F>(
    subscription: Subscription<T>,
    shutdown: CancellationToken,
    render: F,
) -> impl Stream<Item = Result<Event, Infallible>> + Send
where
    T: Send + Sync + 'static,
    R: Serialize,
    F: Fn(&[T]) -> R + Send + 'static,
{
    let collection = subscription.collection();
    async_stream::stream! {
        let mut snapshots = Box::pin(subscription.into_stream());
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => break,
                next = snapshots.next() => next,
            };
            let Some(next) = next else { break };
            match next {
                Ok(snapshot) => {
                    match Event::default().event("snapshot").json_data(render(snapshot.as_slice())) {
                        Ok(event) => yield Ok(event),
                        Err(e) => {
                            tracing::error!(collection = %collection, error = %e, "Failed to encode snapshot");
                            break;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(collection = %collection, error = %e, "Live query failed");
                    yield Ok(Event::default().event("error").data(e.to_string()));
                    break;
                }
            }
        }
        tracing::debug!(collection = %collection, "Live stream closed");
    }
}

fn respond<T, R, F>(
    state: &AppState,
    subscription: Result<Subscription<T>, SessionError>,
    render: F,
) -> Response
where
    T: Send + Sync + 'static,
    R: Serialize + 'static,
    F: Fn(&[T]) -> R + Send + 'static,
{
    match subscription {
        Ok(subscription) => Sse::new(snapshot_stream(subscription, state.shutdown.clone(), render))
            .keep_alive(KeepAlive::default())
            .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// GET /api/v1/admin/live/incidents
pub async fn incidents(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = state.cookies.read_session(&headers);
    respond(&state, state.live.incidents(&session), admin_incident_rows)
}

/// GET /api/v1/admin/live/dashboard-incidents
pub async fn dashboard_incidents(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = state.cookies.read_session(&headers);
    respond(
        &state,
        state.live.dashboard_incidents(&session),
        dashboard_ongoing_incidents,
    )
}

/// GET /api/v1/admin/live/recent-incident-count
pub async fn recent_incident_count(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = state.cookies.read_session(&headers);
    respond(&state, state.live.recent_incident_count(&session), |incidents| {
        RecentIncidentCount {
            count: incidents.len(),
        }
    })
}

/// GET /api/v1/admin/live/dashboard-sos
pub async fn dashboard_sos(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = state.cookies.read_session(&headers);
    respond(&state, state.live.dashboard_sos(&session), |requests| {
        dashboard_active_sos(requests, Utc::now())
    })
}

/// GET /api/v1/admin/live/sos
pub async fn sos_requests(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = state.cookies.read_session(&headers);
    respond(&state, state.live.sos_requests(&session), sos_page_rows)
}

/// GET /api/v1/admin/live/alerts
pub async fn alerts(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = state.cookies.read_session(&headers);
    respond(&state, state.live.alerts(&session), |alerts| alerts.to_vec())
}
