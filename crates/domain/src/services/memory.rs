//! In-memory document store.
//!
//! Used when `storage.backend = "memory"` and by tests. Besides the store
//! traits it exposes read/write counters, injected failures and an optional
//! write delay so tests can observe what the services did to the store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::store::{
    AlertStore, ChangeFeed, Collection, IncidentStore, NotificationStore, PushRegistrationStore,
    SosStore, StoreError, UserStore, WindowQuery,
};
use crate::models::{
    Alert, FcmTokenRegistration, Incident, IncidentStatus, NewAlert, NewIncident, NewNotification,
    NewSosRequest, NotificationRecord, SosRequest, SosStatus, TopicSubscription, UserAccount,
};
use crate::models::alert::ALERT_STATUS_BROADCAST_SENT;

const CHANGE_FEED_CAPACITY: usize = 256;

#[derive(Default)]
struct Tables {
    incidents: Vec<Incident>,
    sos_requests: Vec<SosRequest>,
    alerts: Vec<Alert>,
    notifications: Vec<NotificationRecord>,
    fcm_tokens: HashMap<String, FcmTokenRegistration>,
    topic_subscriptions: HashMap<String, TopicSubscription>,
    users: Vec<UserAccount>,
}

/// A process-local store with the same semantics as the PostgreSQL one.
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    changes: broadcast::Sender<Collection>,
    reads: AtomicUsize,
    writes: Mutex<HashMap<Collection, usize>>,
    failing: Mutex<HashSet<Collection>>,
    failing_writes: Mutex<HashSet<Collection>>,
    write_delay: Option<Duration>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            tables: RwLock::new(Tables::default()),
            changes,
            reads: AtomicUsize::new(0),
            writes: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            failing_writes: Mutex::new(HashSet::new()),
            write_delay: None,
        }
    }

    /// Delay status writes, making concurrent writers overlap.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Make every operation on `collection` fail until restored.
    pub fn fail_collection(&self, collection: Collection) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(collection);
        }
    }

    /// Make writes to `collection` fail while reads keep working.
    pub fn fail_writes(&self, collection: Collection) {
        if let Ok(mut failing) = self.failing_writes.lock() {
            failing.insert(collection);
        }
    }

    pub fn restore_collection(&self, collection: Collection) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.remove(&collection);
        }
        if let Ok(mut failing) = self.failing_writes.lock() {
            failing.remove(&collection);
        }
    }

    /// Number of read operations served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of successful writes to `collection`.
    pub fn write_count(&self, collection: Collection) -> usize {
        self.writes
            .lock()
            .map(|w| w.get(&collection).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Insert a fully formed incident, bypassing id allocation.
    pub fn seed_incident(&self, incident: Incident) {
        if let Ok(mut tables) = self.tables.write() {
            tables.incidents.push(incident);
        }
        self.notify(Collection::Incidents);
    }

    /// Insert a fully formed SOS request.
    pub fn seed_sos(&self, request: SosRequest) {
        if let Ok(mut tables) = self.tables.write() {
            tables.sos_requests.push(request);
        }
        self.notify(Collection::SosRequests);
    }

    pub fn seed_user(&self, account: UserAccount) {
        if let Ok(mut tables) = self.tables.write() {
            tables.users.push(account);
        }
    }

    fn check(
        &self,
        set: &Mutex<HashSet<Collection>>,
        collection: Collection,
    ) -> Result<(), StoreError> {
        let failing = set
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        if failing.contains(&collection) {
            return Err(StoreError::Unavailable(format!(
                "{} is failing (injected)",
                collection
            )));
        }
        Ok(())
    }

    fn read(&self, collection: Collection) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.check(&self.failing, collection)?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    fn write(&self, collection: Collection) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.check(&self.failing, collection)?;
        self.check(&self.failing_writes, collection)?;
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    fn committed(&self, collection: Collection) {
        if let Ok(mut writes) = self.writes.lock() {
            *writes.entry(collection).or_insert(0) += 1;
        }
        self.notify(collection);
    }

    fn notify(&self, collection: Collection) {
        // No receivers is not an error.
        let _ = self.changes.send(collection);
    }

    async fn delay_write(&self) {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Newest first, then windowed and capped. Rows inserted later win ties.
fn windowed<T: Clone>(
    rows: &[T],
    created_at: impl Fn(&T) -> DateTime<Utc>,
    query: WindowQuery,
) -> Vec<T> {
    let since = query.since(Utc::now());
    let mut out: Vec<T> = rows
        .iter()
        .rev()
        .filter(|row| since.map_or(true, |s| created_at(row) >= s))
        .cloned()
        .collect();
    out.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    if let Some(limit) = query.limit {
        out.truncate(limit);
    }
    out
}

fn not_found(collection: Collection, id: Uuid) -> StoreError {
    StoreError::NotFound {
        collection,
        id: id.to_string(),
    }
}

#[async_trait]
impl IncidentStore for InMemoryStore {
    async fn insert_incident(&self, incident: NewIncident) -> Result<Incident, StoreError> {
        let row = Incident {
            id: Uuid::new_v4(),
            incident_id: incident.incident_id,
            incident_type: incident.incident_type,
            description: incident.description,
            location: incident.location,
            reported_by: incident.reported_by,
            status: IncidentStatus::Pending.as_str().to_string(),
            notes: incident.notes,
            created_at: Utc::now(),
            updated_at: None,
            ongoing_at: None,
            resolved_at: None,
        };
        self.write(Collection::Incidents)?.incidents.push(row.clone());
        self.committed(Collection::Incidents);
        Ok(row)
    }

    async fn get_incident(&self, id: Uuid) -> Result<Option<Incident>, StoreError> {
        let tables = self.read(Collection::Incidents)?;
        Ok(tables.incidents.iter().find(|i| i.id == id).cloned())
    }

    async fn list_incidents(&self, query: WindowQuery) -> Result<Vec<Incident>, StoreError> {
        let tables = self.read(Collection::Incidents)?;
        Ok(windowed(&tables.incidents, |i| i.created_at, query))
    }

    async fn latest_incident_number(&self) -> Result<Option<String>, StoreError> {
        let tables = self.read(Collection::Incidents)?;
        Ok(tables
            .incidents
            .iter()
            .map(|i| i.incident_id.clone())
            .max())
    }

    async fn apply_incident_status(
        &self,
        id: Uuid,
        status: IncidentStatus,
        at: DateTime<Utc>,
    ) -> Result<Incident, StoreError> {
        self.delay_write().await;
        let updated = {
            let mut tables = self.write(Collection::Incidents)?;
            let row = tables
                .incidents
                .iter_mut()
                .find(|i| i.id == id)
                .ok_or_else(|| not_found(Collection::Incidents, id))?;
            row.status = status.as_str().to_string();
            row.updated_at = Some(at);
            match status {
                IncidentStatus::Ongoing => {
                    row.ongoing_at.get_or_insert(at);
                }
                IncidentStatus::Resolved => {
                    row.resolved_at.get_or_insert(at);
                }
                IncidentStatus::Pending => {}
            }
            row.clone()
        };
        self.committed(Collection::Incidents);
        Ok(updated)
    }
}

#[async_trait]
impl SosStore for InMemoryStore {
    async fn insert_sos(&self, request: NewSosRequest) -> Result<SosRequest, StoreError> {
        let row = SosRequest {
            id: Uuid::new_v4(),
            request_id: request.request_id,
            display_id: None,
            status: SosStatus::Pending.as_str().to_string(),
            location: request.location,
            reported_by: request.reported_by,
            source: request.source,
            created_at: Utc::now(),
            updated_at: None,
            handled_at: None,
        };
        self.write(Collection::SosRequests)?
            .sos_requests
            .push(row.clone());
        self.committed(Collection::SosRequests);
        Ok(row)
    }

    async fn get_sos(&self, id: Uuid) -> Result<Option<SosRequest>, StoreError> {
        let tables = self.read(Collection::SosRequests)?;
        Ok(tables.sos_requests.iter().find(|s| s.id == id).cloned())
    }

    async fn list_sos(&self, query: WindowQuery) -> Result<Vec<SosRequest>, StoreError> {
        let tables = self.read(Collection::SosRequests)?;
        Ok(windowed(&tables.sos_requests, |s| s.created_at, query))
    }

    async fn latest_request_id(&self) -> Result<Option<i64>, StoreError> {
        let tables = self.read(Collection::SosRequests)?;
        Ok(tables.sos_requests.iter().map(|s| s.request_id).max())
    }

    async fn apply_sos_status(
        &self,
        id: Uuid,
        status: SosStatus,
        at: DateTime<Utc>,
    ) -> Result<SosRequest, StoreError> {
        self.delay_write().await;
        let updated = {
            let mut tables = self.write(Collection::SosRequests)?;
            let row = tables
                .sos_requests
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(|| not_found(Collection::SosRequests, id))?;
            row.status = status.as_str().to_string();
            row.updated_at = Some(at);
            if status == SosStatus::Handled {
                row.handled_at.get_or_insert(at);
            }
            row.clone()
        };
        self.committed(Collection::SosRequests);
        Ok(updated)
    }
}

#[async_trait]
impl AlertStore for InMemoryStore {
    async fn insert_alert(&self, alert: NewAlert) -> Result<Alert, StoreError> {
        let row = Alert {
            id: Uuid::new_v4(),
            title: alert.title,
            message: alert.message,
            alert_type: alert.alert_type,
            click_action: alert.click_action,
            created_by: alert.created_by,
            created_at: Utc::now(),
            message_id: alert.message_id,
            status: ALERT_STATUS_BROADCAST_SENT.to_string(),
        };
        self.write(Collection::Alerts)?.alerts.push(row.clone());
        self.committed(Collection::Alerts);
        Ok(row)
    }

    async fn list_alerts(&self, query: WindowQuery) -> Result<Vec<Alert>, StoreError> {
        let tables = self.read(Collection::Alerts)?;
        Ok(windowed(&tables.alerts, |a| a.created_at, query))
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> Result<NotificationRecord, StoreError> {
        let row = NotificationRecord {
            id: Uuid::new_v4(),
            kind: notification.kind,
            title: notification.title,
            body: notification.body,
            data: notification.data,
            status: notification.status,
            message_id: notification.message_id,
            error: notification.error,
            target_tokens: notification.target_tokens,
            success_count: notification.success_count,
            failure_count: notification.failure_count,
            user_id: notification.user_id,
            report_id: notification.report_id,
            sent_at: Utc::now(),
        };
        self.write(Collection::Notifications)?
            .notifications
            .push(row.clone());
        self.committed(Collection::Notifications);
        Ok(row)
    }

    async fn list_notifications(
        &self,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let tables = self.read(Collection::Notifications)?;
        Ok(windowed(
            &tables.notifications,
            |n| n.sent_at,
            WindowQuery::latest(limit),
        ))
    }
}

#[async_trait]
impl PushRegistrationStore for InMemoryStore {
    async fn upsert_token(&self, registration: FcmTokenRegistration) -> Result<(), StoreError> {
        {
            let mut tables = self.write(Collection::FcmTokens)?;
            match tables.fcm_tokens.get_mut(&registration.user_id) {
                Some(existing) => {
                    existing.token = registration.token;
                    existing.role = registration.role;
                    existing.updated_at = registration.updated_at;
                    let info = registration.device_info;
                    if info.user_agent.is_some() {
                        existing.device_info.user_agent = info.user_agent;
                    }
                    if info.platform.is_some() {
                        existing.device_info.platform = info.platform;
                    }
                    if info.language.is_some() {
                        existing.device_info.language = info.language;
                    }
                }
                None => {
                    tables
                        .fcm_tokens
                        .insert(registration.user_id.clone(), registration);
                }
            }
        }
        self.committed(Collection::FcmTokens);
        Ok(())
    }

    async fn find_token(&self, user_id: &str) -> Result<Option<FcmTokenRegistration>, StoreError> {
        let tables = self.read(Collection::FcmTokens)?;
        Ok(tables.fcm_tokens.get(user_id).cloned())
    }

    async fn record_topic_subscription(
        &self,
        subscription: TopicSubscription,
    ) -> Result<(), StoreError> {
        self.write(Collection::TopicSubscriptions)?
            .topic_subscriptions
            .insert(subscription.key(), subscription);
        self.committed(Collection::TopicSubscriptions);
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_user_by_roll(&self, roll_no: &str) -> Result<Option<UserAccount>, StoreError> {
        let tables = self.read(Collection::Users)?;
        Ok(tables.users.iter().find(|u| u.roll_no == roll_no).cloned())
    }
}

impl ChangeFeed for InMemoryStore {
    fn subscribe(&self) -> broadcast::Receiver<Collection> {
        self.changes.subscribe()
    }
}
