//! FCM token and topic subscription entities (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{DeviceInfo, FcmTokenRegistration, TopicSubscription};
use sqlx::FromRow;

/// Database row mapping for the fcm_tokens table.
#[derive(Debug, Clone, FromRow)]
pub struct FcmTokenEntity {
    pub user_id: String,
    pub token: String,
    pub role: String,
    pub user_agent: Option<String>,
    pub platform: Option<String>,
    pub language: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<FcmTokenEntity> for FcmTokenRegistration {
    fn from(entity: FcmTokenEntity) -> Self {
        Self {
            user_id: entity.user_id,
            token: entity.token,
            role: entity.role,
            device_info: DeviceInfo {
                user_agent: entity.user_agent,
                platform: entity.platform,
                language: entity.language,
            },
            updated_at: entity.updated_at,
        }
    }
}

/// Database row mapping for the topic_subscriptions table.
#[derive(Debug, Clone, FromRow)]
pub struct TopicSubscriptionEntity {
    pub subscription_key: String,
    pub user_id: String,
    pub topic: String,
    pub token: String,
    pub subscribed_at: DateTime<Utc>,
}

impl From<TopicSubscriptionEntity> for TopicSubscription {
    fn from(entity: TopicSubscriptionEntity) -> Self {
        Self {
            user_id: entity.user_id,
            topic: entity.topic,
            token: entity.token,
            subscribed_at: entity.subscribed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fcm_token_entity_to_domain() {
        let entity = FcmTokenEntity {
            user_id: "21CS042".to_string(),
            token: "tok".to_string(),
            role: "user".to_string(),
            user_agent: Some("Mozilla/5.0".to_string()),
            platform: None,
            language: Some("en-IN".to_string()),
            updated_at: Utc::now(),
        };

        let registration: FcmTokenRegistration = entity.into();
        assert_eq!(registration.user_id, "21CS042");
        assert_eq!(registration.device_info.language.as_deref(), Some("en-IN"));
        assert!(registration.device_info.platform.is_none());
    }
}
