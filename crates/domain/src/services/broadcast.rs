//! Admin broadcasts.
//!
//! A broadcast goes out through the fan-out function and, once accepted, is
//! logged in the `alerts` collection. A rejected broadcast leaves no alert.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::messaging::{MessagingError, NotificationFanOut};
use super::session::SessionContext;
use super::store::AlertStore;
use crate::models::NewAlert;

pub const MISSING_BROADCAST_FIELDS: &str =
    "Please provide both a title and message for the notification.";

/// Alert type used when the admin picks none.
pub const DEFAULT_ALERT_TYPE: &str = "general";

/// Fallback sender and author of broadcasts.
const DEFAULT_SENDER: &str = "admin";

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("{0}")]
    Validation(String),

    /// The fan-out rejected the broadcast; its message, unaltered.
    #[error("{0}")]
    Dispatch(String),
}

impl From<MessagingError> for BroadcastError {
    fn from(err: MessagingError) -> Self {
        BroadcastError::Dispatch(err.to_string())
    }
}

/// Request payload for a broadcast.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type")]
    pub alert_type: Option<String>,
    pub click_action: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastReceipt {
    pub message_id: String,
}

/// Sends admin broadcasts and keeps their audit log.
pub struct BroadcastDispatcher {
    fan_out: Arc<dyn NotificationFanOut>,
    alerts: Arc<dyn AlertStore>,
}

impl BroadcastDispatcher {
    pub fn new(fan_out: Arc<dyn NotificationFanOut>, alerts: Arc<dyn AlertStore>) -> Self {
        Self { fan_out, alerts }
    }

    /// Sends a broadcast on behalf of the signed-in admin.
    ///
    /// No idempotency: sending the same request twice sends twice.
    pub async fn broadcast(
        &self,
        session: &SessionContext,
        request: BroadcastRequest,
    ) -> Result<BroadcastReceipt, BroadcastError> {
        let title = request.title.trim();
        let body = request.message.trim();
        if title.is_empty() || body.is_empty() {
            return Err(BroadcastError::Validation(
                MISSING_BROADCAST_FIELDS.to_string(),
            ));
        }

        let alert_type = shared::validation::non_blank(request.alert_type.as_deref())
            .unwrap_or_else(|| DEFAULT_ALERT_TYPE.to_string());
        let click_action = shared::validation::non_blank(request.click_action.as_deref());
        let sender = session
            .roll
            .clone()
            .unwrap_or_else(|| DEFAULT_SENDER.to_string());

        let mut data = BTreeMap::new();
        data.insert("type".to_string(), alert_type.clone());
        data.insert("timestamp".to_string(), chrono::Utc::now().to_rfc3339());
        data.insert("sender".to_string(), sender);
        if let Some(action) = &click_action {
            data.insert("click_action".to_string(), action.clone());
        }

        let message_id = self.fan_out.fan_out(title, body, data).await?;

        info!(message_id = %message_id, alert_type = %alert_type, "Broadcast sent");

        let alert = NewAlert {
            title: title.to_string(),
            message: body.to_string(),
            alert_type,
            click_action,
            created_by: session.author(),
            message_id: message_id.clone(),
        };
        if let Err(e) = self.alerts.insert_alert(alert).await {
            warn!(message_id = %message_id, error = %e, "Failed to store broadcast in alerts");
        }

        Ok(BroadcastReceipt { message_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::services::memory::InMemoryStore;
    use crate::services::messaging::MessagingService;
    use crate::services::push::MockPushGateway;
    use crate::services::store::{AlertStore, Collection, WindowQuery};

    fn admin(roll: Option<&str>) -> SessionContext {
        SessionContext {
            role: Role::Admin,
            logged_in_at: None,
            roll: roll.map(str::to_string),
        }
    }

    fn dispatcher(push: MockPushGateway) -> (Arc<InMemoryStore>, Arc<MockPushGateway>, BroadcastDispatcher) {
        let store = Arc::new(InMemoryStore::new());
        let push = Arc::new(push);
        let messaging = Arc::new(MessagingService::new(store.clone(), push.clone()));
        let dispatcher = BroadcastDispatcher::new(messaging, store.clone());
        (store, push, dispatcher)
    }

    fn request(title: &str, message: &str) -> BroadcastRequest {
        BroadcastRequest {
            title: title.to_string(),
            message: message.to_string(),
            alert_type: Some("emergency".to_string()),
            click_action: None,
        }
    }

    #[tokio::test]
    async fn test_broadcast_logs_alert() {
        let (store, push, dispatcher) = dispatcher(MockPushGateway::new());

        let receipt = dispatcher
            .broadcast(&admin(Some("ADM001")), request("Evacuate", "Block C now"))
            .await
            .unwrap();

        let alerts = store.list_alerts(WindowQuery::latest(50)).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].message_id, receipt.message_id);
        assert_eq!(alerts[0].created_by, "ADM001");
        assert_eq!(alerts[0].status, "broadcast_sent");

        let data = &push.sent()[0].1.data;
        assert_eq!(data.get("sender").map(String::as_str), Some("ADM001"));
        assert_eq!(data.get("type").map(String::as_str), Some("emergency"));
    }

    #[tokio::test]
    async fn test_sender_falls_back_to_admin() {
        let (store, push, dispatcher) = dispatcher(MockPushGateway::new());

        dispatcher
            .broadcast(&admin(None), request("Notice", "Library closed"))
            .await
            .unwrap();

        let data = &push.sent()[0].1.data;
        assert_eq!(data.get("sender").map(String::as_str), Some("admin"));
        let alerts = store.list_alerts(WindowQuery::all()).await.unwrap();
        assert_eq!(alerts[0].created_by, "admin");
    }

    #[tokio::test]
    async fn test_blank_fields_rejected_before_send() {
        let (store, push, dispatcher) = dispatcher(MockPushGateway::new());

        let err = dispatcher
            .broadcast(&admin(None), request("Notice", "   "))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), MISSING_BROADCAST_FIELDS);
        assert!(push.sent().is_empty());
        assert_eq!(store.write_count(Collection::Alerts), 0);
    }

    #[tokio::test]
    async fn test_fan_out_failure_is_verbatim_and_writes_no_alert() {
        let (store, _push, dispatcher) = dispatcher(MockPushGateway::failing("X"));

        let err = dispatcher
            .broadcast(&admin(Some("ADM001")), request("Notice", "Body"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "X");
        assert_eq!(store.write_count(Collection::Alerts), 0);
    }

    #[tokio::test]
    async fn test_alert_write_failure_still_succeeds() {
        let (store, _push, dispatcher) = dispatcher(MockPushGateway::new());
        store.fail_collection(Collection::Alerts);

        let receipt = dispatcher
            .broadcast(&admin(None), request("Notice", "Body"))
            .await;
        assert!(receipt.is_ok());
    }
}
