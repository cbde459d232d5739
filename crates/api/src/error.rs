use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use domain::services::{
    BroadcastError, IntakeError, LifecycleError, MessagingError, SessionError, StoreError,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Push delivery failed; the gateway's message is passed through.
    #[error("Delivery failed: {0}")]
    BadGateway(String),

    /// Caller lacks the required session and is sent to the login page.
    #[error("Redirect to {0}")]
    Redirect(String),

    /// A status write failed. Carries the status to roll back to.
    #[error("Transition failed: {message}")]
    TransitionFailed {
        message: String,
        previous_status: Option<String>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationDetail>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut previous = None;
        let (status, error_code, message) = match self {
            ApiError::Redirect(location) => {
                return (
                    StatusCode::SEE_OTHER,
                    [(header::LOCATION, location)],
                )
                    .into_response();
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "delivery_failed", msg),
            ApiError::TransitionFailed {
                message,
                previous_status,
            } => {
                previous = previous_status;
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "transition_failed",
                    message,
                )
            }
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            details: None,
            previous_status: previous,
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => {
                ApiError::NotFound(format!("{} document {} not found", collection, id))
            }
            StoreError::Unavailable(msg) => ApiError::ServiceUnavailable(msg),
            StoreError::Database(msg) => ApiError::Internal(format!("Database error: {}", msg)),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Redirect { location, .. } => ApiError::Redirect(location),
            SessionError::Validation(msg) => ApiError::Validation(msg),
            SessionError::UnknownAccount | SessionError::WrongPassword => {
                ApiError::Unauthorized(err.to_string())
            }
            SessionError::Credential(msg) => ApiError::Internal(msg),
            SessionError::Store(e) => e.into(),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::InvalidStatus { message } => ApiError::Validation(message),
            LifecycleError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} {} not found", entity, id))
            }
            LifecycleError::WriteFailed {
                message,
                previous_status,
                source,
            } => {
                tracing::error!(error = %source, "Status write failed");
                ApiError::TransitionFailed {
                    message: message.to_string(),
                    previous_status,
                }
            }
        }
    }
}

impl From<BroadcastError> for ApiError {
    fn from(err: BroadcastError) -> Self {
        match err {
            BroadcastError::Validation(msg) => ApiError::Validation(msg),
            BroadcastError::Dispatch(msg) => ApiError::BadGateway(msg),
        }
    }
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::Validation(msg) => ApiError::Validation(msg),
            IntakeError::Invalid(errors) => errors.into(),
            IntakeError::Store(e) => e.into(),
        }
    }
}

impl From<MessagingError> for ApiError {
    fn from(err: MessagingError) -> Self {
        match err {
            MessagingError::Validation(msg) => ApiError::Validation(msg),
            MessagingError::Delivery(msg) => ApiError::BadGateway(msg),
            MessagingError::Store(e) => e.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details: Vec<ValidationDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationDetail {
                    field: field.to_string(),
                    message: e.message.clone().map(|m| m.to_string()).unwrap_or_default(),
                })
            })
            .collect();

        let message = if details.len() == 1 {
            details[0].message.clone()
        } else {
            format!("{} validation errors", details.len())
        };

        ApiError::Validation(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use domain::services::store::Collection;
    use uuid::Uuid;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_api_error_status_codes() {
        let cases = [
            (ApiError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                ApiError::ServiceUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (ApiError::BadGateway("x".into()), StatusCode::BAD_GATEWAY),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_redirect_sets_location() {
        let response = ApiError::Redirect("/login.html".into()).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/login.html"
        );
    }

    #[tokio::test]
    async fn test_transition_failure_carries_previous_status() {
        let error: ApiError = LifecycleError::WriteFailed {
            message: "Failed to update status. Please retry.",
            previous_status: Some("pending".into()),
            source: StoreError::Unavailable("down".into()),
        }
        .into();

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Failed to update status. Please retry.");
        assert_eq!(body["previousStatus"], "pending");
    }

    #[tokio::test]
    async fn test_dispatch_failure_message_is_verbatim() {
        let error: ApiError = BroadcastError::Dispatch("Requested entity was not found.".into()).into();
        let body = body_json(error.into_response()).await;
        assert_eq!(body["message"], "Requested entity was not found.");
    }

    #[test]
    fn test_from_store_error() {
        let not_found: ApiError = StoreError::NotFound {
            collection: Collection::Incidents,
            id: "abc".into(),
        }
        .into();
        assert!(matches!(not_found, ApiError::NotFound(_)));

        let unavailable: ApiError = StoreError::Unavailable("pool closed".into()).into();
        assert!(matches!(unavailable, ApiError::ServiceUnavailable(_)));
    }

    #[test]
    fn test_from_session_error() {
        let redirect: ApiError = SessionError::Redirect {
            required: domain::models::Role::Admin,
            location: "/login.html".into(),
        }
        .into();
        assert!(matches!(redirect, ApiError::Redirect(ref l) if l == "/login.html"));

        let wrong: ApiError = SessionError::WrongPassword.into();
        assert_eq!(
            wrong.to_string(),
            "Unauthorized: Incorrect password. Please try again."
        );
    }

    #[test]
    fn test_from_lifecycle_not_found() {
        let error: ApiError = LifecycleError::NotFound {
            entity: "incident",
            id: Uuid::nil(),
        }
        .into();
        assert!(matches!(error, ApiError::NotFound(_)));
    }
}
