//! Incident entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the incidents table.
#[derive(Debug, Clone, FromRow)]
pub struct IncidentEntity {
    pub id: Uuid,
    pub incident_id: String,
    pub incident_type: String,
    pub description: String,
    pub location: String,
    pub reported_by: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub ongoing_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<IncidentEntity> for domain::models::Incident {
    fn from(entity: IncidentEntity) -> Self {
        Self {
            id: entity.id,
            incident_id: entity.incident_id,
            incident_type: entity.incident_type,
            description: entity.description,
            location: entity.location,
            reported_by: entity.reported_by,
            status: entity.status,
            notes: entity.notes,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            ongoing_at: entity.ongoing_at,
            resolved_at: entity.resolved_at,
        }
    }
}
