//! SOS request entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::SosLocation;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the sos_requests table.
///
/// The location is flattened into four nullable columns.
#[derive(Debug, Clone, FromRow)]
pub struct SosRequestEntity {
    pub id: Uuid,
    pub request_id: i64,
    pub display_id: Option<i64>,
    pub status: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub address: Option<String>,
    pub reported_by: Option<String>,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub handled_at: Option<DateTime<Utc>>,
}

impl SosRequestEntity {
    fn location(&self) -> Option<SosLocation> {
        if self.latitude.is_none()
            && self.longitude.is_none()
            && self.accuracy.is_none()
            && self.address.is_none()
        {
            return None;
        }
        Some(SosLocation {
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: self.accuracy,
            address: self.address.clone(),
        })
    }
}

impl From<SosRequestEntity> for domain::models::SosRequest {
    fn from(entity: SosRequestEntity) -> Self {
        let location = entity.location();
        Self {
            id: entity.id,
            request_id: entity.request_id,
            display_id: entity.display_id,
            status: entity.status,
            location,
            reported_by: entity.reported_by,
            source: entity.source,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            handled_at: entity.handled_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity() -> SosRequestEntity {
        SosRequestEntity {
            id: Uuid::new_v4(),
            request_id: 1001,
            display_id: None,
            status: "pending".to_string(),
            latitude: None,
            longitude: None,
            accuracy: None,
            address: None,
            reported_by: None,
            source: "user-dashboard".to_string(),
            created_at: Utc::now(),
            updated_at: None,
            handled_at: None,
        }
    }

    #[test]
    fn test_missing_location_columns_map_to_none() {
        let sos: domain::models::SosRequest = entity().into();
        assert!(sos.location.is_none());
        assert_eq!(sos.request_id, 1001);
    }

    #[test]
    fn test_location_columns_map_to_location() {
        let mut row = entity();
        row.latitude = Some(12.97);
        row.longitude = Some(77.59);

        let sos: domain::models::SosRequest = row.into();
        let location = sos.location.unwrap();
        assert_eq!(location.latitude, Some(12.97));
        assert!(location.address.is_none());
    }
}
