//! Incident repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::IncidentEntity;
use crate::metrics::QueryTimer;

const INCIDENT_COLUMNS: &str = "id, incident_id, incident_type, description, location, reported_by, \
     status, notes, created_at, updated_at, ongoing_at, resolved_at";

/// Input for inserting an incident.
#[derive(Debug, Clone)]
pub struct IncidentInput<'a> {
    pub incident_id: &'a str,
    pub incident_type: &'a str,
    pub description: &'a str,
    pub location: &'a str,
    pub reported_by: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// Repository for incident database operations.
#[derive(Clone)]
pub struct IncidentRepository {
    pool: PgPool,
}

impl IncidentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new incident with status `pending`.
    pub async fn insert(&self, input: IncidentInput<'_>) -> Result<IncidentEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_incident");
        let sql = format!(
            r#"
            INSERT INTO incidents (incident_id, incident_type, description, location, reported_by, notes, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending')
            RETURNING {}
            "#,
            INCIDENT_COLUMNS
        );
        let result = sqlx::query_as::<_, IncidentEntity>(&sql)
            .bind(input.incident_id)
            .bind(input.incident_type)
            .bind(input.description)
            .bind(input.location)
            .bind(input.reported_by)
            .bind(input.notes)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<IncidentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_incident_by_id");
        let sql = format!("SELECT {} FROM incidents WHERE id = $1", INCIDENT_COLUMNS);
        let result = sqlx::query_as::<_, IncidentEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// List incidents newest first, optionally created at or after `since`.
    pub async fn list(
        &self,
        since: Option<DateTime<Utc>>,
        limit: Option<i64>,
    ) -> Result<Vec<IncidentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_incidents");
        let sql = format!(
            r#"
            SELECT {}
            FROM incidents
            WHERE ($1::timestamptz IS NULL OR created_at >= $1)
            ORDER BY created_at DESC
            LIMIT $2
            "#,
            INCIDENT_COLUMNS
        );
        let result = sqlx::query_as::<_, IncidentEntity>(&sql)
            .bind(since)
            .bind(limit)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Highest incident number, compared as text.
    pub async fn latest_incident_number(&self) -> Result<Option<String>, sqlx::Error> {
        let timer = QueryTimer::new("latest_incident_number");
        let result = sqlx::query_scalar::<_, String>(
            r#"
            SELECT incident_id FROM incidents
            ORDER BY incident_id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Set the status and `updated_at`. `ongoing_at` and `resolved_at` are
    /// only filled when moving into that status and still unset.
    pub async fn update_status(
        &self,
        id: Uuid,
        status: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<IncidentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_incident_status");
        let sql = format!(
            r#"
            UPDATE incidents
            SET status = $2,
                updated_at = $3,
                ongoing_at = CASE WHEN $2 = 'ongoing' THEN COALESCE(ongoing_at, $3) ELSE ongoing_at END,
                resolved_at = CASE WHEN $2 = 'resolved' THEN COALESCE(resolved_at, $3) ELSE resolved_at END
            WHERE id = $1
            RETURNING {}
            "#,
            INCIDENT_COLUMNS
        );
        let result = sqlx::query_as::<_, IncidentEntity>(&sql)
            .bind(id)
            .bind(status)
            .bind(at)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }
}
