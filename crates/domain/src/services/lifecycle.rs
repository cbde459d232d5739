//! Status lifecycle of incidents and SOS requests.
//!
//! The store accepts any transition; the controller only validates that the
//! target status belongs to the entity's vocabulary, stamps the transition
//! time once, and runs the side effects of resolving an incident.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::push::{PushGateway, PushMessage, PushTarget};
use super::store::{DocumentStore, StoreError};
use crate::models::{
    Incident, IncidentStatus, NewNotification, NotificationKind, NotificationStatus, SosRequest,
    SosStatus,
};

/// Shown when an SOS status write fails.
pub const SOS_UPDATE_FAILED: &str = "Could not update SOS status. Please retry.";

/// Shown when an incident status write fails.
pub const INCIDENT_UPDATE_FAILED: &str = "Failed to update status. Please retry.";

pub const REPORT_RESOLVED_TITLE: &str = "Your incident was resolved";

/// Errors from a status transition.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("{message}")]
    InvalidStatus { message: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// The write failed. `previous_status` is the status before the attempt,
    /// for callers that applied the change optimistically.
    #[error("{message}")]
    WriteFailed {
        message: &'static str,
        previous_status: Option<String>,
        #[source]
        source: StoreError,
    },
}

/// Result of an SOS transition.
#[derive(Debug, Clone)]
pub enum TransitionOutcome<T> {
    Applied(T),
    /// Another transition for the same document was still in flight.
    Skipped,
}

/// Per-document in-flight set.
#[derive(Debug, Default)]
pub struct InFlightGuard {
    ids: Mutex<HashSet<Uuid>>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recovers the set if a holder panicked.
    fn ids(&self) -> MutexGuard<'_, HashSet<Uuid>> {
        self.ids.lock().unwrap_or_else(|poisoned| {
            warn!("SOS in-flight set was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Claims `id`, or returns `None` if it is already claimed.
    pub fn try_acquire(&self, id: Uuid) -> Option<InFlightPermit<'_>> {
        if self.ids().insert(id) {
            Some(InFlightPermit { guard: self, id })
        } else {
            None
        }
    }

    pub fn is_in_flight(&self, id: Uuid) -> bool {
        self.ids().contains(&id)
    }
}

/// Releases its id when dropped.
#[derive(Debug)]
pub struct InFlightPermit<'a> {
    guard: &'a InFlightGuard,
    id: Uuid,
}

impl Drop for InFlightPermit<'_> {
    fn drop(&mut self) {
        self.guard.ids().remove(&self.id);
    }
}

/// Applies status transitions and their side effects.
pub struct StatusLifecycle {
    store: Arc<dyn DocumentStore>,
    push: Arc<dyn PushGateway>,
    sos_in_flight: InFlightGuard,
}

impl StatusLifecycle {
    pub fn new(store: Arc<dyn DocumentStore>, push: Arc<dyn PushGateway>) -> Self {
        Self {
            store,
            push,
            sos_in_flight: InFlightGuard::new(),
        }
    }

    /// Moves an incident to `status`.
    ///
    /// Every write of `resolved` also notifies the reporter, even when the
    /// incident was already resolved; that notification never fails the
    /// transition. Only `resolvedAt` is set once.
    pub async fn transition_incident(
        &self,
        id: Uuid,
        status: &str,
    ) -> Result<Incident, LifecycleError> {
        let target: IncidentStatus = status
            .parse()
            .map_err(|message| LifecycleError::InvalidStatus { message })?;

        let current = self
            .store
            .get_incident(id)
            .await
            .map_err(|source| LifecycleError::WriteFailed {
                message: INCIDENT_UPDATE_FAILED,
                previous_status: None,
                source,
            })?
            .ok_or(LifecycleError::NotFound {
                entity: "Incident",
                id,
            })?;

        let updated = self
            .store
            .apply_incident_status(id, target, Utc::now())
            .await
            .map_err(|source| {
                warn!(incident_id = %id, error = %source, "Incident status update failed");
                LifecycleError::WriteFailed {
                    message: INCIDENT_UPDATE_FAILED,
                    previous_status: Some(current.status.clone()),
                    source,
                }
            })?;

        info!(
            incident_id = %id,
            from = %current.status,
            to = %target,
            "Incident status updated"
        );

        if target == IncidentStatus::Resolved {
            self.notify_reporter(&updated).await;
        }

        Ok(updated)
    }

    /// Moves an SOS request to `status`.
    ///
    /// A second transition for the same request while the first is still
    /// writing is dropped and reported as [`TransitionOutcome::Skipped`].
    pub async fn transition_sos(
        &self,
        id: Uuid,
        status: &str,
    ) -> Result<TransitionOutcome<SosRequest>, LifecycleError> {
        let target: SosStatus = status
            .parse()
            .map_err(|message| LifecycleError::InvalidStatus { message })?;

        let Some(_permit) = self.sos_in_flight.try_acquire(id) else {
            info!(sos_id = %id, "SOS status change already in flight, skipping");
            return Ok(TransitionOutcome::Skipped);
        };

        let current = self
            .store
            .get_sos(id)
            .await
            .map_err(|source| LifecycleError::WriteFailed {
                message: SOS_UPDATE_FAILED,
                previous_status: None,
                source,
            })?
            .ok_or(LifecycleError::NotFound {
                entity: "SOS request",
                id,
            })?;

        let updated = self
            .store
            .apply_sos_status(id, target, Utc::now())
            .await
            .map_err(|source| {
                warn!(sos_id = %id, error = %source, "SOS status update failed");
                LifecycleError::WriteFailed {
                    message: SOS_UPDATE_FAILED,
                    previous_status: Some(current.status.clone()),
                    source,
                }
            })?;

        info!(sos_id = %id, from = %current.status, to = %target, "SOS status updated");

        Ok(TransitionOutcome::Applied(updated))
    }

    /// Best effort: queue a notification record for the reporter and push to
    /// their registered token. Failures are logged and swallowed.
    async fn notify_reporter(&self, incident: &Incident) {
        let body = format!(
            "Incident {} has been marked as resolved",
            incident.display_id()
        );

        let mut record = NewNotification::new(
            NotificationKind::ReportResolved,
            NotificationStatus::Queued,
            REPORT_RESOLVED_TITLE,
            body.clone(),
        );
        record.user_id = incident.reported_by.clone();
        record.report_id = Some(incident.id);

        if let Err(e) = self.store.insert_notification(record).await {
            warn!(incident_id = %incident.id, error = %e, "Notification enqueue failed (non-blocking)");
        }

        let Some(reporter) = incident.reported_by.as_deref() else {
            return;
        };

        let registration = match self.store.find_token(reporter).await {
            Ok(Some(registration)) => registration,
            Ok(None) => return,
            Err(e) => {
                warn!(reporter = %reporter, error = %e, "Reporter token lookup failed (non-blocking)");
                return;
            }
        };

        let mut data = std::collections::BTreeMap::new();
        data.insert("type".to_string(), NotificationKind::ReportResolved.to_string());
        data.insert("reportId".to_string(), incident.id.to_string());
        let message = PushMessage::new(REPORT_RESOLVED_TITLE, body)
            .with_web_push_assets()
            .with_data(data);

        if let Err(e) = self
            .push
            .send(PushTarget::Token(registration.token), &message)
            .await
        {
            warn!(reporter = %reporter, error = %e, "Reporter push failed (non-blocking)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FcmTokenRegistration, NewIncident, NewSosRequest};
    use crate::services::memory::InMemoryStore;
    use crate::services::push::MockPushGateway;
    use crate::services::store::{
        Collection, IncidentStore, NotificationStore, PushRegistrationStore, SosStore,
    };
    use std::time::Duration;

    async fn seeded_incident(store: &InMemoryStore) -> Incident {
        store
            .insert_incident(NewIncident {
                incident_id: "10001".to_string(),
                incident_type: "Electrical".to_string(),
                description: "Exposed wiring".to_string(),
                location: "Block D".to_string(),
                reported_by: Some("21CS042".to_string()),
                notes: None,
            })
            .await
            .unwrap()
    }

    async fn seeded_sos(store: &InMemoryStore) -> SosRequest {
        store
            .insert_sos(NewSosRequest {
                request_id: 1001,
                location: None,
                reported_by: Some("21CS042".to_string()),
                source: "user-dashboard".to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_status_rejected_before_write() {
        let store = Arc::new(InMemoryStore::new());
        let incident = seeded_incident(&store).await;
        let lifecycle = StatusLifecycle::new(store.clone(), Arc::new(MockPushGateway::new()));

        let err = lifecycle
            .transition_incident(incident.id, "handled")
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidStatus { .. }));
        assert_eq!(store.write_count(Collection::Incidents), 1);
    }

    #[tokio::test]
    async fn test_resolving_twice_sets_resolved_at_once() {
        let store = Arc::new(InMemoryStore::new());
        let incident = seeded_incident(&store).await;
        let lifecycle = StatusLifecycle::new(store.clone(), Arc::new(MockPushGateway::new()));

        let first = lifecycle
            .transition_incident(incident.id, "resolved")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = lifecycle
            .transition_incident(incident.id, "resolved")
            .await
            .unwrap();

        assert!(first.resolved_at.is_some());
        assert_eq!(first.resolved_at, second.resolved_at);
        assert!(second.updated_at > first.updated_at);
    }

    #[tokio::test]
    async fn test_resolve_queues_reporter_notification_and_push() {
        let store = Arc::new(InMemoryStore::new());
        let push = Arc::new(MockPushGateway::new());
        let incident = seeded_incident(&store).await;
        store
            .upsert_token(FcmTokenRegistration {
                user_id: "21CS042".to_string(),
                token: "reporter-token".to_string(),
                role: "user".to_string(),
                device_info: Default::default(),
                updated_at: Utc::now(),
            })
            .await
            .unwrap();
        let lifecycle = StatusLifecycle::new(store.clone(), push.clone());

        lifecycle
            .transition_incident(incident.id, "resolved")
            .await
            .unwrap();

        let records = store.list_notifications(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, NotificationKind::ReportResolved);
        assert_eq!(records[0].title, "Your incident was resolved");
        assert_eq!(records[0].body, "Incident 10001 has been marked as resolved");
        assert_eq!(records[0].report_id, Some(incident.id));

        let sent = push.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, PushTarget::Token("reporter-token".to_string()));
    }

    #[tokio::test]
    async fn test_every_resolve_write_notifies_reporter() {
        let store = Arc::new(InMemoryStore::new());
        let push = Arc::new(MockPushGateway::new());
        let incident = seeded_incident(&store).await;
        store
            .upsert_token(FcmTokenRegistration {
                user_id: "21CS042".to_string(),
                token: "reporter-token".to_string(),
                role: "user".to_string(),
                device_info: Default::default(),
                updated_at: Utc::now(),
            })
            .await
            .unwrap();
        let lifecycle = StatusLifecycle::new(store.clone(), push.clone());

        let first = lifecycle
            .transition_incident(incident.id, "resolved")
            .await
            .unwrap();
        let second = lifecycle
            .transition_incident(incident.id, "resolved")
            .await
            .unwrap();

        assert_eq!(first.resolved_at, second.resolved_at);
        let records = store.list_notifications(10).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records
            .iter()
            .all(|r| r.kind == NotificationKind::ReportResolved));
        assert_eq!(push.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_transition() {
        let store = Arc::new(InMemoryStore::new());
        let incident = seeded_incident(&store).await;
        store.fail_collection(Collection::Notifications);
        let lifecycle = StatusLifecycle::new(store.clone(), Arc::new(MockPushGateway::failing("down")));

        let updated = lifecycle
            .transition_incident(incident.id, "resolved")
            .await
            .unwrap();
        assert_eq!(updated.status, "resolved");
    }

    #[tokio::test]
    async fn test_write_failure_reports_previous_status() {
        let store = Arc::new(InMemoryStore::new());
        let sos = seeded_sos(&store).await;
        let lifecycle = StatusLifecycle::new(store.clone(), Arc::new(MockPushGateway::new()));
        lifecycle.transition_sos(sos.id, "ongoing").await.unwrap();

        store.fail_writes(Collection::SosRequests);
        let err = lifecycle.transition_sos(sos.id, "handled").await.unwrap_err();

        assert_eq!(err.to_string(), SOS_UPDATE_FAILED);
        match err {
            LifecycleError::WriteFailed {
                previous_status, ..
            } => assert_eq!(previous_status.as_deref(), Some("ongoing")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!lifecycle.sos_in_flight.is_in_flight(sos.id));
    }

    #[tokio::test]
    async fn test_incident_write_failure_message() {
        let store = Arc::new(InMemoryStore::new());
        let incident = seeded_incident(&store).await;
        store.fail_writes(Collection::Incidents);
        let lifecycle = StatusLifecycle::new(store.clone(), Arc::new(MockPushGateway::new()));

        let err = lifecycle
            .transition_incident(incident.id, "ongoing")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to update status. Please retry.");
    }

    #[tokio::test]
    async fn test_handled_sets_handled_at() {
        let store = Arc::new(InMemoryStore::new());
        let sos = seeded_sos(&store).await;
        let lifecycle = StatusLifecycle::new(store.clone(), Arc::new(MockPushGateway::new()));

        let outcome = lifecycle.transition_sos(sos.id, "handled").await.unwrap();
        match outcome {
            TransitionOutcome::Applied(updated) => {
                assert_eq!(updated.status, "handled");
                assert!(updated.handled_at.is_some());
            }
            TransitionOutcome::Skipped => panic!("expected the write to apply"),
        }
    }

    #[tokio::test]
    async fn test_concurrent_sos_changes_write_once() {
        let store = Arc::new(InMemoryStore::new().with_write_delay(Duration::from_millis(50)));
        let sos = seeded_sos(&store).await;
        let writes_before = store.write_count(Collection::SosRequests);
        let lifecycle = StatusLifecycle::new(store.clone(), Arc::new(MockPushGateway::new()));

        let (a, b) = tokio::join!(
            lifecycle.transition_sos(sos.id, "ongoing"),
            lifecycle.transition_sos(sos.id, "handled"),
        );

        let skipped = [a.unwrap(), b.unwrap()]
            .iter()
            .filter(|o| matches!(o, TransitionOutcome::Skipped))
            .count();
        assert_eq!(skipped, 1);
        assert_eq!(store.write_count(Collection::SosRequests) - writes_before, 1);
    }

    #[test]
    fn test_in_flight_permit_releases_on_drop() {
        let guard = InFlightGuard::new();
        let id = Uuid::new_v4();
        {
            let _permit = guard.try_acquire(id).unwrap();
            assert!(guard.try_acquire(id).is_none());
        }
        assert!(guard.try_acquire(id).is_some());
    }

    #[test]
    fn test_poisoned_in_flight_set_still_admits_new_ids() {
        let guard = InFlightGuard::new();
        let held = Uuid::new_v4();
        let _permit = guard.try_acquire(held).unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ids = guard.ids.lock().unwrap();
            panic!("poison the set");
        }));
        assert!(result.is_err());
        assert!(guard.ids.is_poisoned());

        let id = Uuid::new_v4();
        assert!(guard.try_acquire(id).is_some());
        assert!(guard.is_in_flight(held));
        assert!(guard.try_acquire(held).is_none());
    }
}
