//! Alert repository for database operations.

use chrono::{DateTime, Utc};
use domain::models::NewAlert;
use sqlx::PgPool;

use crate::entities::AlertEntity;
use crate::metrics::QueryTimer;

/// Repository for the broadcast audit log.
#[derive(Clone)]
pub struct AlertRepository {
    pool: PgPool,
}

impl AlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, alert: &NewAlert, status: &str) -> Result<AlertEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_alert");
        let result = sqlx::query_as::<_, AlertEntity>(
            r#"
            INSERT INTO alerts (title, message, alert_type, click_action, created_by, message_id, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, title, message, alert_type, click_action, created_by, created_at, message_id, status
            "#,
        )
        .bind(&alert.title)
        .bind(&alert.message)
        .bind(&alert.alert_type)
        .bind(alert.click_action.as_deref())
        .bind(&alert.created_by)
        .bind(&alert.message_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn list(
        &self,
        since: Option<DateTime<Utc>>,
        limit: Option<i64>,
    ) -> Result<Vec<AlertEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_alerts");
        let result = sqlx::query_as::<_, AlertEntity>(
            r#"
            SELECT id, title, message, alert_type, click_action, created_by, created_at, message_id, status
            FROM alerts
            WHERE ($1::timestamptz IS NULL OR created_at >= $1)
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
