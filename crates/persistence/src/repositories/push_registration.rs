//! FCM token and topic subscription repository.

use domain::models::{FcmTokenRegistration, TopicSubscription};
use sqlx::PgPool;

use crate::entities::FcmTokenEntity;
use crate::metrics::QueryTimer;

/// Repository for push registrations.
#[derive(Clone)]
pub struct PushRegistrationRepository {
    pool: PgPool,
}

impl PushRegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or merge a token registration. Device fields missing from the
    /// new registration keep their stored values.
    pub async fn upsert_token(&self, registration: &FcmTokenRegistration) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("upsert_fcm_token");
        let result = sqlx::query(
            r#"
            INSERT INTO fcm_tokens (user_id, token, role, user_agent, platform, language, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                token = EXCLUDED.token,
                role = EXCLUDED.role,
                user_agent = COALESCE(EXCLUDED.user_agent, fcm_tokens.user_agent),
                platform = COALESCE(EXCLUDED.platform, fcm_tokens.platform),
                language = COALESCE(EXCLUDED.language, fcm_tokens.language),
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&registration.user_id)
        .bind(&registration.token)
        .bind(&registration.role)
        .bind(registration.device_info.user_agent.as_deref())
        .bind(registration.device_info.platform.as_deref())
        .bind(registration.device_info.language.as_deref())
        .bind(registration.updated_at)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }

    pub async fn find_token(&self, user_id: &str) -> Result<Option<FcmTokenEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_fcm_token");
        let result = sqlx::query_as::<_, FcmTokenEntity>(
            r#"
            SELECT user_id, token, role, user_agent, platform, language, updated_at
            FROM fcm_tokens
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Insert or replace the subscription stored under its key.
    pub async fn upsert_topic_subscription(
        &self,
        subscription: &TopicSubscription,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("upsert_topic_subscription");
        let result = sqlx::query(
            r#"
            INSERT INTO topic_subscriptions (subscription_key, user_id, topic, token, subscribed_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (subscription_key) DO UPDATE SET
                token = EXCLUDED.token,
                subscribed_at = EXCLUDED.subscribed_at
            "#,
        )
        .bind(subscription.key())
        .bind(&subscription.user_id)
        .bind(&subscription.topic)
        .bind(&subscription.token)
        .bind(subscription.subscribed_at)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }
}
