//! Push messaging functions.
//!
//! Topic fan-out, targeted multicast, notification history, topic
//! subscription and token registration. Every fan-out attempt that passes
//! validation leaves a `notifications` record, whether delivery succeeded
//! or not.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::push::{PushGateway, PushMessage, PushTarget};
use super::store::{DocumentStore, StoreError};
use crate::models::push_registration::RegisterTokenRequest;
use crate::models::{
    FcmTokenRegistration, NewNotification, NotificationKind, NotificationRecord,
    NotificationStatus, Role, TopicSubscription,
};

pub const MISSING_SEND_FIELDS: &str = "Missing required fields: title and body are required";
pub const MISSING_TARGETED_FIELDS: &str =
    "Missing required fields: title, body, and tokens array are required";
pub const MISSING_SUBSCRIBE_FIELDS: &str = "Missing required fields: token and topic are required";

/// Topic every registered token joins.
pub const DEFAULT_TOPIC: &str = "all";

/// Click target used when the caller supplies none.
pub const DEFAULT_CLICK_ACTION: &str = "/";

pub const DEFAULT_HISTORY_LIMIT: usize = 50;
const MAX_HISTORY_LIMIT: usize = 500;

/// Errors from the messaging functions.
#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("{0}")]
    Validation(String),

    /// Delivery failed; the message is the gateway's, unaltered.
    #[error("{0}")]
    Delivery(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Request payload of `sendNotification`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendNotificationRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Request payload of `sendTargetedNotification`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendTargetedRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tokens: Option<Vec<String>>,
    #[serde(default)]
    pub data: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Request payload of `subscribeToTopic`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscribeRequest {
    pub token: Option<String>,
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    pub message_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MulticastReceipt {
    pub success_count: usize,
    pub failure_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationReceipt {
    pub topic: String,
    pub subscribed: bool,
}

/// Flattens a JSON object into the string map push data requires.
/// Strings are kept as-is; other values use their JSON text.
pub fn data_from_json(
    data: Option<&serde_json::Map<String, serde_json::Value>>,
) -> BTreeMap<String, String> {
    data.map(|map| {
        map.iter()
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect()
    })
    .unwrap_or_default()
}

fn required(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Something that can fan a notification out to every subscriber.
#[async_trait]
pub trait NotificationFanOut: Send + Sync {
    /// Returns the platform message id.
    async fn fan_out(
        &self,
        title: &str,
        body: &str,
        data: BTreeMap<String, String>,
    ) -> Result<String, MessagingError>;
}

/// The messaging functions.
pub struct MessagingService {
    store: Arc<dyn DocumentStore>,
    push: Arc<dyn PushGateway>,
    topic: String,
}

impl MessagingService {
    pub fn new(store: Arc<dyn DocumentStore>, push: Arc<dyn PushGateway>) -> Self {
        Self {
            store,
            push,
            topic: DEFAULT_TOPIC.to_string(),
        }
    }

    /// Fan out to a topic other than `all`.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Sends a notification to every token subscribed to the topic.
    pub async fn send_to_all(
        &self,
        request: SendNotificationRequest,
    ) -> Result<SendReceipt, MessagingError> {
        let (Some(title), Some(body)) = (
            required(request.title.as_deref()),
            required(request.body.as_deref()),
        ) else {
            return Err(MessagingError::Validation(MISSING_SEND_FIELDS.to_string()));
        };

        let data = data_from_json(request.data.as_ref());
        let message_id = self.fan_out(title, body, data).await?;
        Ok(SendReceipt { message_id })
    }

    /// Sends a notification to an explicit list of tokens.
    pub async fn send_targeted(
        &self,
        request: SendTargetedRequest,
    ) -> Result<MulticastReceipt, MessagingError> {
        let (Some(title), Some(body), Some(tokens)) = (
            required(request.title.as_deref()),
            required(request.body.as_deref()),
            request.tokens.as_ref().filter(|t| !t.is_empty()),
        ) else {
            return Err(MessagingError::Validation(
                MISSING_TARGETED_FIELDS.to_string(),
            ));
        };

        let data = data_from_json(request.data.as_ref());
        let message = PushMessage::new(title, body)
            .with_web_push_assets()
            .with_data(delivery_data(&data));

        let report = self.push.send_multicast(tokens, &message).await;
        info!(
            success_count = report.success_count,
            failure_count = report.failure_count,
            title = %title,
            "Targeted notification sent"
        );

        let mut record = NewNotification::new(
            NotificationKind::Targeted,
            NotificationStatus::Sent,
            title,
            body,
        );
        record.data = data;
        record.target_tokens = tokens.clone();
        record.success_count = Some(report.success_count as i32);
        record.failure_count = Some(report.failure_count as i32);
        self.record(record).await;

        Ok(MulticastReceipt {
            success_count: report.success_count,
            failure_count: report.failure_count,
        })
    }

    /// Newest notifications first. Non-positive or absent limits use the
    /// default.
    pub async fn history(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<NotificationRecord>, MessagingError> {
        let limit = limit
            .filter(|l| *l > 0)
            .map(|l| (l as usize).min(MAX_HISTORY_LIMIT))
            .unwrap_or(DEFAULT_HISTORY_LIMIT);
        Ok(self.store.list_notifications(limit).await?)
    }

    /// Subscribes a token to a topic. When the caller is known, the
    /// subscription is recorded under `{userId}_{topic}`.
    pub async fn subscribe_to_topic(
        &self,
        request: SubscribeRequest,
        user_id: Option<&str>,
    ) -> Result<String, MessagingError> {
        let (Some(token), Some(topic)) = (
            required(request.token.as_deref()),
            required(request.topic.as_deref()),
        ) else {
            return Err(MessagingError::Validation(
                MISSING_SUBSCRIBE_FIELDS.to_string(),
            ));
        };

        shared::validation::validate_topic_name(topic).map_err(|e| {
            MessagingError::Validation(
                e.message
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Invalid topic name".to_string()),
            )
        })?;

        self.push
            .subscribe_to_topic(&[token.to_string()], topic)
            .await
            .map_err(|e| MessagingError::Delivery(e.to_string()))?;

        info!(topic = %topic, "Token subscribed to topic");

        if let Some(user_id) = user_id {
            let subscription = TopicSubscription {
                user_id: user_id.to_string(),
                topic: topic.to_string(),
                token: token.to_string(),
                subscribed_at: Utc::now(),
            };
            if let Err(e) = self.store.record_topic_subscription(subscription).await {
                warn!(user_id = %user_id, topic = %topic, error = %e, "Failed to record topic subscription");
            }
        }

        Ok(format!("Successfully subscribed to topic: {}", topic))
    }

    /// Stores the caller's push token and joins it to the default topic.
    /// A failed topic join is logged; the registration still stands.
    pub async fn register_token(
        &self,
        user_id: &str,
        role: Role,
        request: RegisterTokenRequest,
    ) -> Result<RegistrationReceipt, MessagingError> {
        let token = request.token.trim().to_string();
        if token.is_empty() {
            return Err(MessagingError::Validation(
                "Missing required field: token".to_string(),
            ));
        }

        self.store
            .upsert_token(FcmTokenRegistration {
                user_id: user_id.to_string(),
                token: token.clone(),
                role: role.to_string(),
                device_info: request.device_info,
                updated_at: Utc::now(),
            })
            .await?;

        info!(user_id = %user_id, "Push token stored");

        let subscribed = match self
            .subscribe_to_topic(
                SubscribeRequest {
                    token: Some(token),
                    topic: Some(self.topic.clone()),
                },
                Some(user_id),
            )
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Topic subscription after registration failed");
                false
            }
        };

        Ok(RegistrationReceipt {
            topic: self.topic.clone(),
            subscribed,
        })
    }

    async fn record(&self, record: NewNotification) {
        let kind = record.kind;
        if let Err(e) = self.store.insert_notification(record).await {
            warn!(kind = %kind, error = %e, "Failed to store notification history");
        }
    }
}

/// Data actually delivered: the caller's data plus a timestamp and a click
/// action.
fn delivery_data(data: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut payload = data.clone();
    payload.insert("timestamp".to_string(), Utc::now().to_rfc3339());
    payload
        .entry("click_action".to_string())
        .or_insert_with(|| DEFAULT_CLICK_ACTION.to_string());
    payload
}

#[async_trait]
impl NotificationFanOut for MessagingService {
    async fn fan_out(
        &self,
        title: &str,
        body: &str,
        data: BTreeMap<String, String>,
    ) -> Result<String, MessagingError> {
        let message = PushMessage::new(title, body)
            .with_web_push_assets()
            .with_data(delivery_data(&data));

        let result = self
            .push
            .send(PushTarget::Topic(self.topic.clone()), &message)
            .await;

        let mut record = NewNotification::new(
            NotificationKind::Broadcast,
            NotificationStatus::Sent,
            title,
            body,
        );
        record.data = data;

        match result {
            Ok(message_id) => {
                info!(message_id = %message_id, title = %title, "Notification sent successfully");
                record.message_id = Some(message_id.clone());
                self.record(record).await;
                Ok(message_id)
            }
            Err(e) => {
                warn!(error = %e, title = %title, "Error sending notification");
                record.status = NotificationStatus::Failed;
                record.error = Some(e.to_string());
                self.record(record).await;
                Err(MessagingError::Delivery(e.to_string()))
            }
        }
    }
}
