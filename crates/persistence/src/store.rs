//! PostgreSQL implementation of the domain store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::alert::ALERT_STATUS_BROADCAST_SENT;
use domain::models::{
    Alert, FcmTokenRegistration, Incident, IncidentStatus, NewAlert, NewIncident, NewNotification,
    NewSosRequest, NotificationRecord, SosRequest, SosStatus, TopicSubscription, UserAccount,
};
use domain::services::store::{
    AlertStore, ChangeFeed, Collection, IncidentStore, NotificationStore, PushRegistrationStore,
    SosStore, StoreError, UserStore, WindowQuery,
};
use sqlx::PgPool;
use tokio::sync::broadcast;
use tracing::error;
use uuid::Uuid;

use crate::repositories::{
    AlertRepository, IncidentInput, IncidentRepository, NotificationRepository,
    PushRegistrationRepository, SosRequestRepository, UserRepository,
};

/// Capacity of the in-process change fan-out.
const CHANGE_BUFFER: usize = 256;

fn db_error(operation: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |e| {
        error!(operation, error = %e, "Database operation failed");
        let message = e.to_string();
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(message)
            }
            _ => StoreError::Database(message),
        }
    }
}

fn limit(query: &WindowQuery) -> Option<i64> {
    query.limit.map(|l| l as i64)
}

/// Document store backed by PostgreSQL.
///
/// Change notifications arrive through [`crate::listener::spawn_change_listener`],
/// which forwards into the sender handed out by [`PgStore::change_sender`].
#[derive(Clone)]
pub struct PgStore {
    incidents: IncidentRepository,
    sos_requests: SosRequestRepository,
    alerts: AlertRepository,
    notifications: NotificationRepository,
    push: PushRegistrationRepository,
    users: UserRepository,
    changes: broadcast::Sender<Collection>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            incidents: IncidentRepository::new(pool.clone()),
            sos_requests: SosRequestRepository::new(pool.clone()),
            alerts: AlertRepository::new(pool.clone()),
            notifications: NotificationRepository::new(pool.clone()),
            push: PushRegistrationRepository::new(pool.clone()),
            users: UserRepository::new(pool),
            changes,
        }
    }

    /// Sender the change listener publishes into.
    pub fn change_sender(&self) -> broadcast::Sender<Collection> {
        self.changes.clone()
    }
}

impl ChangeFeed for PgStore {
    fn subscribe(&self) -> broadcast::Receiver<Collection> {
        self.changes.subscribe()
    }
}

#[async_trait]
impl IncidentStore for PgStore {
    async fn insert_incident(&self, incident: NewIncident) -> Result<Incident, StoreError> {
        let entity = self
            .incidents
            .insert(IncidentInput {
                incident_id: &incident.incident_id,
                incident_type: &incident.incident_type,
                description: &incident.description,
                location: &incident.location,
                reported_by: incident.reported_by.as_deref(),
                notes: incident.notes.as_deref(),
            })
            .await
            .map_err(db_error("insert_incident"))?;
        Ok(entity.into())
    }

    async fn get_incident(&self, id: Uuid) -> Result<Option<Incident>, StoreError> {
        let entity = self
            .incidents
            .find_by_id(id)
            .await
            .map_err(db_error("get_incident"))?;
        Ok(entity.map(Into::into))
    }

    async fn list_incidents(&self, query: WindowQuery) -> Result<Vec<Incident>, StoreError> {
        let entities = self
            .incidents
            .list(query.since(Utc::now()), limit(&query))
            .await
            .map_err(db_error("list_incidents"))?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn latest_incident_number(&self) -> Result<Option<String>, StoreError> {
        self.incidents
            .latest_incident_number()
            .await
            .map_err(db_error("latest_incident_number"))
    }

    async fn apply_incident_status(
        &self,
        id: Uuid,
        status: IncidentStatus,
        at: DateTime<Utc>,
    ) -> Result<Incident, StoreError> {
        self.incidents
            .update_status(id, status.as_str(), at)
            .await
            .map_err(db_error("apply_incident_status"))?
            .map(Into::into)
            .ok_or_else(|| StoreError::NotFound {
                collection: Collection::Incidents,
                id: id.to_string(),
            })
    }
}

#[async_trait]
impl SosStore for PgStore {
    async fn insert_sos(&self, request: NewSosRequest) -> Result<SosRequest, StoreError> {
        let entity = self
            .sos_requests
            .insert(
                request.request_id,
                request.location.as_ref(),
                request.reported_by.as_deref(),
                &request.source,
            )
            .await
            .map_err(db_error("insert_sos"))?;
        Ok(entity.into())
    }

    async fn get_sos(&self, id: Uuid) -> Result<Option<SosRequest>, StoreError> {
        let entity = self
            .sos_requests
            .find_by_id(id)
            .await
            .map_err(db_error("get_sos"))?;
        Ok(entity.map(Into::into))
    }

    async fn list_sos(&self, query: WindowQuery) -> Result<Vec<SosRequest>, StoreError> {
        let entities = self
            .sos_requests
            .list(query.since(Utc::now()), limit(&query))
            .await
            .map_err(db_error("list_sos"))?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn latest_request_id(&self) -> Result<Option<i64>, StoreError> {
        self.sos_requests
            .latest_request_id()
            .await
            .map_err(db_error("latest_request_id"))
    }

    async fn apply_sos_status(
        &self,
        id: Uuid,
        status: SosStatus,
        at: DateTime<Utc>,
    ) -> Result<SosRequest, StoreError> {
        self.sos_requests
            .update_status(id, status.as_str(), at)
            .await
            .map_err(db_error("apply_sos_status"))?
            .map(Into::into)
            .ok_or_else(|| StoreError::NotFound {
                collection: Collection::SosRequests,
                id: id.to_string(),
            })
    }
}

#[async_trait]
impl AlertStore for PgStore {
    async fn insert_alert(&self, alert: NewAlert) -> Result<Alert, StoreError> {
        let entity = self
            .alerts
            .insert(&alert, ALERT_STATUS_BROADCAST_SENT)
            .await
            .map_err(db_error("insert_alert"))?;
        Ok(entity.into())
    }

    async fn list_alerts(&self, query: WindowQuery) -> Result<Vec<Alert>, StoreError> {
        let entities = self
            .alerts
            .list(query.since(Utc::now()), limit(&query))
            .await
            .map_err(db_error("list_alerts"))?;
        Ok(entities.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> Result<NotificationRecord, StoreError> {
        let entity = self
            .notifications
            .insert(&notification)
            .await
            .map_err(db_error("insert_notification"))?;
        NotificationRecord::try_from(entity).map_err(StoreError::Database)
    }

    async fn list_notifications(
        &self,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let entities = self
            .notifications
            .list_recent(limit as i64)
            .await
            .map_err(db_error("list_notifications"))?;
        entities
            .into_iter()
            .map(|e| NotificationRecord::try_from(e).map_err(StoreError::Database))
            .collect()
    }
}

#[async_trait]
impl PushRegistrationStore for PgStore {
    async fn upsert_token(&self, registration: FcmTokenRegistration) -> Result<(), StoreError> {
        self.push
            .upsert_token(&registration)
            .await
            .map_err(db_error("upsert_token"))
    }

    async fn find_token(&self, user_id: &str) -> Result<Option<FcmTokenRegistration>, StoreError> {
        let entity = self
            .push
            .find_token(user_id)
            .await
            .map_err(db_error("find_token"))?;
        Ok(entity.map(Into::into))
    }

    async fn record_topic_subscription(
        &self,
        subscription: TopicSubscription,
    ) -> Result<(), StoreError> {
        self.push
            .upsert_topic_subscription(&subscription)
            .await
            .map_err(db_error("record_topic_subscription"))
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_roll(&self, roll_no: &str) -> Result<Option<UserAccount>, StoreError> {
        let entity = self
            .users
            .find_by_roll(roll_no)
            .await
            .map_err(db_error("find_user_by_roll"))?;
        Ok(entity.map(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_map_to_unavailable() {
        let err = db_error("test")(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Unavailable(_)));

        let err = db_error("test")(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn test_window_limit() {
        assert_eq!(limit(&WindowQuery::latest(25)), Some(25));
        assert_eq!(limit(&WindowQuery::all()), None);
    }
}
