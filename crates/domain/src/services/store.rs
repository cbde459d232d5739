//! Document store abstraction.
//!
//! Each collection gets its own trait; [`DocumentStore`] bundles them with
//! the change feed so services can hold a single `Arc<dyn DocumentStore>`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{
    Alert, FcmTokenRegistration, Incident, IncidentStatus, NewAlert, NewIncident, NewNotification,
    NewSosRequest, NotificationRecord, SosRequest, SosStatus, TopicSubscription, UserAccount,
};

/// Errors raised by store implementations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{collection} document {id} not found")]
    NotFound { collection: Collection, id: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Collections that emit change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Incidents,
    SosRequests,
    Alerts,
    Notifications,
    FcmTokens,
    TopicSubscriptions,
    Users,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Incidents,
        Collection::SosRequests,
        Collection::Alerts,
        Collection::Notifications,
        Collection::FcmTokens,
        Collection::TopicSubscriptions,
        Collection::Users,
    ];

    /// Table name, also the payload of change notifications.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Incidents => "incidents",
            Collection::SosRequests => "sos_requests",
            Collection::Alerts => "alerts",
            Collection::Notifications => "notifications",
            Collection::FcmTokens => "fcm_tokens",
            Collection::TopicSubscriptions => "topic_subscriptions",
            Collection::Users => "users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incidents" => Ok(Collection::Incidents),
            "sos_requests" => Ok(Collection::SosRequests),
            "alerts" => Ok(Collection::Alerts),
            "notifications" => Ok(Collection::Notifications),
            "fcm_tokens" => Ok(Collection::FcmTokens),
            "topic_subscriptions" => Ok(Collection::TopicSubscriptions),
            "users" => Ok(Collection::Users),
            _ => Err(format!("Unknown collection: {}", s)),
        }
    }
}

/// Shape of a list query: newest `createdAt` first, optionally restricted to
/// a trailing time window and capped.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowQuery {
    pub window: Option<Duration>,
    pub limit: Option<usize>,
}

impl WindowQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn latest(limit: usize) -> Self {
        Self {
            window: None,
            limit: Some(limit),
        }
    }

    pub fn within(window: Duration) -> Self {
        Self {
            window: Some(window),
            limit: None,
        }
    }

    /// Lower bound on `createdAt`, relative to `now`.
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.window.map(|w| now - w)
    }
}

/// Change notification source. Each message names the collection written to.
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<Collection>;
}

#[async_trait]
pub trait IncidentStore: Send + Sync {
    async fn insert_incident(&self, incident: NewIncident) -> Result<Incident, StoreError>;

    async fn get_incident(&self, id: Uuid) -> Result<Option<Incident>, StoreError>;

    async fn list_incidents(&self, query: WindowQuery) -> Result<Vec<Incident>, StoreError>;

    /// Highest stored incident number, ordered as text.
    async fn latest_incident_number(&self) -> Result<Option<String>, StoreError>;

    /// Writes `status` and `updatedAt`; the matching transition timestamp is
    /// written only if it is still unset.
    async fn apply_incident_status(
        &self,
        id: Uuid,
        status: IncidentStatus,
        at: DateTime<Utc>,
    ) -> Result<Incident, StoreError>;
}

#[async_trait]
pub trait SosStore: Send + Sync {
    async fn insert_sos(&self, request: NewSosRequest) -> Result<SosRequest, StoreError>;

    async fn get_sos(&self, id: Uuid) -> Result<Option<SosRequest>, StoreError>;

    async fn list_sos(&self, query: WindowQuery) -> Result<Vec<SosRequest>, StoreError>;

    async fn latest_request_id(&self) -> Result<Option<i64>, StoreError>;

    /// Writes `status` and `updatedAt`; `handledAt` only if still unset.
    async fn apply_sos_status(
        &self,
        id: Uuid,
        status: SosStatus,
        at: DateTime<Utc>,
    ) -> Result<SosRequest, StoreError>;
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn insert_alert(&self, alert: NewAlert) -> Result<Alert, StoreError>;

    async fn list_alerts(&self, query: WindowQuery) -> Result<Vec<Alert>, StoreError>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> Result<NotificationRecord, StoreError>;

    /// Newest `sentAt` first.
    async fn list_notifications(&self, limit: usize)
        -> Result<Vec<NotificationRecord>, StoreError>;
}

#[async_trait]
pub trait PushRegistrationStore: Send + Sync {
    /// Insert or merge the token registration of `registration.user_id`.
    async fn upsert_token(&self, registration: FcmTokenRegistration) -> Result<(), StoreError>;

    async fn find_token(&self, user_id: &str) -> Result<Option<FcmTokenRegistration>, StoreError>;

    async fn record_topic_subscription(
        &self,
        subscription: TopicSubscription,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_roll(&self, roll_no: &str) -> Result<Option<UserAccount>, StoreError>;
}

/// Everything the services need from a backing store.
pub trait DocumentStore:
    IncidentStore
    + SosStore
    + AlertStore
    + NotificationStore
    + PushRegistrationStore
    + UserStore
    + ChangeFeed
{
}

impl<T> DocumentStore for T where
    T: IncidentStore
        + SosStore
        + AlertStore
        + NotificationStore
        + PushRegistrationStore
        + UserStore
        + ChangeFeed
{
}
