//! Notification record entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{NotificationKind, NotificationRecord, NotificationStatus};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Database row mapping for the notifications table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationEntity {
    pub id: Uuid,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub data: Json<BTreeMap<String, String>>,
    pub status: String,
    pub message_id: Option<String>,
    pub error: Option<String>,
    pub target_tokens: Vec<String>,
    pub success_count: Option<i32>,
    pub failure_count: Option<i32>,
    pub user_id: Option<String>,
    pub report_id: Option<Uuid>,
    pub sent_at: DateTime<Utc>,
}

impl TryFrom<NotificationEntity> for NotificationRecord {
    type Error = String;

    fn try_from(entity: NotificationEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entity.id,
            kind: entity.kind.parse::<NotificationKind>()?,
            title: entity.title,
            body: entity.body,
            data: entity.data.0,
            status: entity.status.parse::<NotificationStatus>()?,
            message_id: entity.message_id,
            error: entity.error,
            target_tokens: entity.target_tokens,
            success_count: entity.success_count,
            failure_count: entity.failure_count,
            user_id: entity.user_id,
            report_id: entity.report_id,
            sent_at: entity.sent_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(kind: &str, status: &str) -> NotificationEntity {
        NotificationEntity {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            title: "Title".to_string(),
            body: "Body".to_string(),
            data: Json(BTreeMap::new()),
            status: status.to_string(),
            message_id: None,
            error: None,
            target_tokens: vec![],
            success_count: None,
            failure_count: None,
            user_id: None,
            report_id: None,
            sent_at: Utc::now(),
        }
    }

    #[test]
    fn test_notification_entity_to_domain() {
        let record = NotificationRecord::try_from(entity("report_resolved", "queued")).unwrap();
        assert_eq!(record.kind, NotificationKind::ReportResolved);
        assert_eq!(record.status, NotificationStatus::Queued);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(NotificationRecord::try_from(entity("sms", "sent")).is_err());
    }
}
