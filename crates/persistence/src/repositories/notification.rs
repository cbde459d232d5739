//! Notification record repository for database operations.

use domain::models::NewNotification;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::entities::NotificationEntity;
use crate::metrics::QueryTimer;

const NOTIFICATION_COLUMNS: &str = "id, kind, title, body, data, status, message_id, error, \
     target_tokens, success_count, failure_count, user_id, report_id, sent_at";

/// Repository for push notification records.
#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        notification: &NewNotification,
    ) -> Result<NotificationEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_notification");
        let sql = format!(
            r#"
            INSERT INTO notifications
                (kind, title, body, data, status, message_id, error, target_tokens,
                 success_count, failure_count, user_id, report_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        );
        let result = sqlx::query_as::<_, NotificationEntity>(&sql)
            .bind(notification.kind.as_str())
            .bind(&notification.title)
            .bind(&notification.body)
            .bind(Json(&notification.data))
            .bind(notification.status.as_str())
            .bind(notification.message_id.as_deref())
            .bind(notification.error.as_deref())
            .bind(&notification.target_tokens)
            .bind(notification.success_count)
            .bind(notification.failure_count)
            .bind(notification.user_id.as_deref())
            .bind(notification.report_id)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Newest first by `sent_at`.
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<NotificationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_notifications");
        let sql = format!(
            "SELECT {} FROM notifications ORDER BY sent_at DESC LIMIT $1",
            NOTIFICATION_COLUMNS
        );
        let result = sqlx::query_as::<_, NotificationEntity>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }
}
