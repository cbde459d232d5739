//! Alert entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the alerts table.
#[derive(Debug, Clone, FromRow)]
pub struct AlertEntity {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub alert_type: String,
    pub click_action: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub message_id: String,
    pub status: String,
}

impl From<AlertEntity> for domain::models::Alert {
    fn from(entity: AlertEntity) -> Self {
        Self {
            id: entity.id,
            title: entity.title,
            message: entity.message,
            alert_type: entity.alert_type,
            click_action: entity.click_action,
            created_by: entity.created_by,
            created_at: entity.created_at,
            message_id: entity.message_id,
            status: entity.status,
        }
    }
}
