//! SOS request repository for database operations.

use chrono::{DateTime, Utc};
use domain::models::SosLocation;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::SosRequestEntity;
use crate::metrics::QueryTimer;

const SOS_COLUMNS: &str = "id, request_id, display_id, status, latitude, longitude, accuracy, \
     address, reported_by, source, created_at, updated_at, handled_at";

/// Repository for SOS request database operations.
#[derive(Clone)]
pub struct SosRequestRepository {
    pool: PgPool,
}

impl SosRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new SOS request with status `pending`.
    pub async fn insert(
        &self,
        request_id: i64,
        location: Option<&SosLocation>,
        reported_by: Option<&str>,
        source: &str,
    ) -> Result<SosRequestEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_sos_request");
        let sql = format!(
            r#"
            INSERT INTO sos_requests
                (request_id, latitude, longitude, accuracy, address, reported_by, source, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending')
            RETURNING {}
            "#,
            SOS_COLUMNS
        );
        let result = sqlx::query_as::<_, SosRequestEntity>(&sql)
            .bind(request_id)
            .bind(location.and_then(|l| l.latitude))
            .bind(location.and_then(|l| l.longitude))
            .bind(location.and_then(|l| l.accuracy))
            .bind(location.and_then(|l| l.address.as_deref()))
            .bind(reported_by)
            .bind(source)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<SosRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_sos_request_by_id");
        let sql = format!("SELECT {} FROM sos_requests WHERE id = $1", SOS_COLUMNS);
        let result = sqlx::query_as::<_, SosRequestEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// List SOS requests newest first, optionally created at or after `since`.
    pub async fn list(
        &self,
        since: Option<DateTime<Utc>>,
        limit: Option<i64>,
    ) -> Result<Vec<SosRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_sos_requests");
        let sql = format!(
            r#"
            SELECT {}
            FROM sos_requests
            WHERE ($1::timestamptz IS NULL OR created_at >= $1)
            ORDER BY created_at DESC
            LIMIT $2
            "#,
            SOS_COLUMNS
        );
        let result = sqlx::query_as::<_, SosRequestEntity>(&sql)
            .bind(since)
            .bind(limit)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn latest_request_id(&self) -> Result<Option<i64>, sqlx::Error> {
        let timer = QueryTimer::new("latest_sos_request_id");
        let result = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT request_id FROM sos_requests
            ORDER BY request_id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Set the status and `updated_at`; `handled_at` is filled once.
    pub async fn update_status(
        &self,
        id: Uuid,
        status: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<SosRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_sos_request_status");
        let sql = format!(
            r#"
            UPDATE sos_requests
            SET status = $2,
                updated_at = $3,
                handled_at = CASE WHEN $2 = 'handled' THEN COALESCE(handled_at, $3) ELSE handled_at END
            WHERE id = $1
            RETURNING {}
            "#,
            SOS_COLUMNS
        );
        let result = sqlx::query_as::<_, SosRequestEntity>(&sql)
            .bind(id)
            .bind(status)
            .bind(at)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }
}
