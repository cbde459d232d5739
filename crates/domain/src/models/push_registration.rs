//! Push token registrations and topic subscriptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Browser metadata captured with a push token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// The current push token of a user, keyed by user id (the roll number).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FcmTokenRegistration {
    pub user_id: String,
    pub token: String,
    pub role: String,
    #[serde(default)]
    pub device_info: DeviceInfo,
    pub updated_at: DateTime<Utc>,
}

/// A token subscribed to a topic on behalf of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSubscription {
    pub user_id: String,
    pub topic: String,
    pub token: String,
    pub subscribed_at: DateTime<Utc>,
}

impl TopicSubscription {
    /// Document key: `{userId}_{topic}`.
    pub fn key(&self) -> String {
        subscription_key(&self.user_id, &self.topic)
    }
}

pub fn subscription_key(user_id: &str, topic: &str) -> String {
    format!("{}_{}", user_id, topic)
}

/// Request payload for registering a push token.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTokenRequest {
    #[validate(length(min = 1, max = 4096, message = "token must be 1-4096 characters"))]
    pub token: String,

    #[serde(default)]
    pub device_info: DeviceInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_key() {
        let sub = TopicSubscription {
            user_id: "21CS042".to_string(),
            topic: "all".to_string(),
            token: "tok".to_string(),
            subscribed_at: Utc::now(),
        };
        assert_eq!(sub.key(), "21CS042_all");
    }

    #[test]
    fn test_register_request_defaults_device_info() {
        let req: RegisterTokenRequest = serde_json::from_str(r#"{"token":"abc"}"#).unwrap();
        assert_eq!(req.device_info, DeviceInfo::default());
        assert!(req.validate().is_ok());
    }
}
