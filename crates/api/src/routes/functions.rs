//! Messaging functions.
//!
//! Public JSON endpoints for sending notifications, reading the
//! notification log and managing topic membership. Their request and
//! response shapes are fixed by the web clients that call them.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use domain::models::NotificationRecord;
use domain::services::session::ROLL_KEY;
use domain::services::{
    MessagingError, SendNotificationRequest, SendTargetedRequest, SessionStorage,
    SubscribeRequest,
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;

/// Error body of the messaging functions.
#[derive(Debug, Serialize)]
pub struct FunctionError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl FunctionError {
    /// Validation failures are 400 with the reason; everything else is 500
    /// with `failure` as the error and the cause as details.
    fn respond(err: MessagingError, failure: &str) -> Response {
        match err {
            MessagingError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                Json(FunctionError {
                    error: message,
                    details: None,
                }),
            )
                .into_response(),
            other => {
                tracing::error!(error = %other, "{}", failure);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(FunctionError {
                        error: failure.to_string(),
                        details: Some(other.to_string()),
                    }),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationResponse {
    pub success: bool,
    pub message_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTargetedResponse {
    pub success: bool,
    pub success_count: usize,
    pub failure_count: usize,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub notifications: Vec<NotificationRecord>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<String>,
}

/// A body that is not valid JSON is treated as an empty request, so the
/// caller gets the missing-fields error.
fn body_or_default<T: Default>(body: Result<Json<T>, JsonRejection>) -> T {
    match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable function request body");
            T::default()
        }
    }
}

/// Reads a leading integer the way a lenient number parser would:
/// `"20"` and `"20abc"` give 20; anything without leading digits gives
/// `None`.
pub fn parse_limit(raw: Option<&str>) -> Option<i64> {
    let raw = raw?.trim();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// POST /sendNotification
pub async fn send_notification(
    State(state): State<AppState>,
    body: Result<Json<SendNotificationRequest>, JsonRejection>,
) -> Response {
    match state.messaging.send_to_all(body_or_default(body)).await {
        Ok(receipt) => Json(SendNotificationResponse {
            success: true,
            message_id: receipt.message_id,
            message: "Notification sent successfully to all users".to_string(),
        })
        .into_response(),
        Err(e) => FunctionError::respond(e, "Failed to send notification"),
    }
}

/// POST /sendTargetedNotification
pub async fn send_targeted_notification(
    State(state): State<AppState>,
    body: Result<Json<SendTargetedRequest>, JsonRejection>,
) -> Response {
    match state.messaging.send_targeted(body_or_default(body)).await {
        Ok(receipt) => Json(SendTargetedResponse {
            success: true,
            success_count: receipt.success_count,
            failure_count: receipt.failure_count,
            message: "Targeted notification sent successfully".to_string(),
        })
        .into_response(),
        Err(e) => FunctionError::respond(e, "Failed to send targeted notification"),
    }
}

/// GET /getNotificationHistory?limit=N
pub async fn get_notification_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let limit = parse_limit(query.limit.as_deref());
    match state.messaging.history(limit).await {
        Ok(notifications) => Json(HistoryResponse {
            success: true,
            count: notifications.len(),
            notifications,
        })
        .into_response(),
        Err(e) => FunctionError::respond(e, "Failed to fetch notification history"),
    }
}

/// POST /subscribeToTopic
///
/// When the caller carries a session, the subscription is also recorded
/// under their roll number.
pub async fn subscribe_to_topic(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Response {
    let user_id = state
        .cookies
        .read_session(&headers)
        .get(ROLL_KEY)
        .filter(|r| !r.is_empty());

    match state
        .messaging
        .subscribe_to_topic(body_or_default(body), user_id.as_deref())
        .await
    {
        Ok(message) => Json(SubscribeResponse {
            success: true,
            message,
        })
        .into_response(),
        Err(e) => FunctionError::respond(e, "Failed to subscribe to topic"),
    }
}

/// Any other method on a function route.
pub async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(FunctionError {
            error: "Method not allowed".to_string(),
            details: None,
        }),
    )
        .into_response()
}
