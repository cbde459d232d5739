//! Live query subscriptions.
//!
//! A subscription delivers the full result set of a query immediately and
//! again after every change to its collection. Each subscription is a task
//! that re-runs the query on change notifications and publishes into a
//! `watch` channel, so a slow reader only ever sees the newest snapshot.
//!
//! Teardown is deterministic: after [`Subscription::unsubscribe`] (or drop)
//! no further snapshot is returned. A failing query ends the subscription
//! with a single [`SnapshotError`].

use futures::Stream;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::store::{Collection, DocumentStore, StoreError, WindowQuery};
use crate::models::{Alert, Incident, SosRequest};

/// A full result set. Shared so that fan-out to several readers is cheap.
pub type Snapshot<T> = Arc<Vec<T>>;

/// Terminal error of a subscription.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Failed to load {collection}: {message}")]
pub struct SnapshotError {
    pub collection: Collection,
    pub message: String,
}

type Slot<T> = Option<Result<Snapshot<T>, SnapshotError>>;

/// Handle to a running live query.
pub struct Subscription<T> {
    collection: Collection,
    rx: watch::Receiver<Slot<T>>,
    token: CancellationToken,
    finished: bool,
}

impl<T> Subscription<T> {
    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Waits for the next snapshot.
    ///
    /// Returns `None` once the subscription has been torn down or after its
    /// terminal error was returned.
    pub async fn next(&mut self) -> Option<Result<Snapshot<T>, SnapshotError>> {
        if self.finished || self.token.is_cancelled() {
            return None;
        }

        let changed = tokio::select! {
            _ = self.token.cancelled() => return None,
            changed = self.rx.changed() => changed,
        };
        if changed.is_err() {
            self.finished = true;
            return None;
        }

        let item = self.rx.borrow_and_update().clone();
        match item {
            Some(Ok(snapshot)) => Some(Ok(snapshot)),
            Some(Err(err)) => {
                self.finished = true;
                Some(Err(err))
            }
            None => None,
        }
    }

    /// Stops the subscription. Idempotent.
    pub fn unsubscribe(&mut self) {
        if !self.token.is_cancelled() {
            debug!(collection = %self.collection, "Live query unsubscribed");
            self.token.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        !self.finished && !self.token.is_cancelled()
    }
}

impl<T: Send + Sync + 'static> Subscription<T> {
    /// Converts the subscription into a stream that ends with it.
    pub fn into_stream(self) -> impl Stream<Item = Result<Snapshot<T>, SnapshotError>> + Send {
        futures::stream::unfold(self, |mut sub| async move {
            sub.next().await.map(|item| (item, sub))
        })
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Starts a live query over `collection`, re-running `fetch` after every
/// change notification for it.
///
/// The change feed is subscribed before the first fetch, so no change made
/// after this call is missed.
pub fn subscribe<T, F, Fut>(
    changes: broadcast::Receiver<Collection>,
    collection: Collection,
    fetch: F,
) -> Subscription<T>
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<T>, StoreError>> + Send + 'static,
{
    let (tx, rx) = watch::channel::<Slot<T>>(None);
    let token = CancellationToken::new();

    tokio::spawn(run(changes, collection, fetch, tx, token.clone()));

    debug!(collection = %collection, "Live query subscribed");

    Subscription {
        collection,
        rx,
        token,
        finished: false,
    }
}

async fn run<T, F, Fut>(
    mut changes: broadcast::Receiver<Collection>,
    collection: Collection,
    fetch: F,
    tx: watch::Sender<Slot<T>>,
    token: CancellationToken,
) where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Vec<T>, StoreError>>,
{
    loop {
        let result = tokio::select! {
            _ = token.cancelled() => return,
            result = fetch() => result,
        };

        match result {
            Ok(rows) => {
                if tx.send(Some(Ok(Arc::new(rows)))).is_err() {
                    return;
                }
            }
            Err(err) => {
                warn!(collection = %collection, error = %err, "Live query failed");
                let _ = tx.send(Some(Err(SnapshotError {
                    collection,
                    message: err.to_string(),
                })));
                return;
            }
        }

        // Wait for a change to this collection.
        loop {
            let received = tokio::select! {
                _ = token.cancelled() => return,
                _ = tx.closed() => return,
                received = changes.recv() => received,
            };
            match received {
                Ok(changed) if changed == collection => break,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(collection = %collection, skipped, "Change feed lagged, re-querying");
                    break;
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }
}

/// Live queries over the store's collections.
#[derive(Clone)]
pub struct LiveQueries {
    store: Arc<dyn DocumentStore>,
}

impl LiveQueries {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn incidents(&self, query: WindowQuery) -> Subscription<Incident> {
        let store = self.store.clone();
        subscribe(self.store.subscribe(), Collection::Incidents, move || {
            let store = store.clone();
            async move { store.list_incidents(query).await }
        })
    }

    pub fn sos_requests(&self, query: WindowQuery) -> Subscription<SosRequest> {
        let store = self.store.clone();
        subscribe(self.store.subscribe(), Collection::SosRequests, move || {
            let store = store.clone();
            async move { store.list_sos(query).await }
        })
    }

    pub fn alerts(&self, query: WindowQuery) -> Subscription<Alert> {
        let store = self.store.clone();
        subscribe(self.store.subscribe(), Collection::Alerts, move || {
            let store = store.clone();
            async move { store.list_alerts(query).await }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewIncident;
    use crate::services::memory::InMemoryStore;
    use crate::services::store::IncidentStore;
    use std::time::Duration;

    fn new_incident(number: &str) -> NewIncident {
        NewIncident {
            incident_id: number.to_string(),
            incident_type: "Other".to_string(),
            description: "Leaking pipe".to_string(),
            location: "Hostel A".to_string(),
            reported_by: None,
            notes: None,
        }
    }

    async fn next_within<T>(sub: &mut Subscription<T>) -> Option<Result<Snapshot<T>, SnapshotError>> {
        tokio::time::timeout(Duration::from_secs(2), sub.next())
            .await
            .expect("timed out waiting for snapshot")
    }

    #[tokio::test]
    async fn test_initial_snapshot_then_updates() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_incident(new_incident("10001")).await.unwrap();

        let live = LiveQueries::new(store.clone());
        let mut sub = live.incidents(WindowQuery::latest(50));

        let first = next_within(&mut sub).await.unwrap().unwrap();
        assert_eq!(first.len(), 1);

        store.insert_incident(new_incident("10002")).await.unwrap();
        let second = next_within(&mut sub).await.unwrap().unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].incident_id, "10002");
    }

    #[tokio::test]
    async fn test_no_snapshots_after_unsubscribe() {
        let store = Arc::new(InMemoryStore::new());
        let live = LiveQueries::new(store.clone());
        let mut sub = live.incidents(WindowQuery::all());
        next_within(&mut sub).await.unwrap().unwrap();

        sub.unsubscribe();
        store.insert_incident(new_incident("10001")).await.unwrap();

        assert!(sub.next().await.is_none());
        assert!(!sub.is_active());
    }

    #[tokio::test]
    async fn test_resubscribe_yields_fresh_initial_snapshot() {
        let store = Arc::new(InMemoryStore::new());
        let live = LiveQueries::new(store.clone());

        let mut first = live.incidents(WindowQuery::all());
        next_within(&mut first).await.unwrap().unwrap();
        drop(first);

        store.insert_incident(new_incident("10001")).await.unwrap();

        let mut second = live.incidents(WindowQuery::all());
        let snapshot = next_within(&mut second).await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn test_query_failure_is_terminal() {
        let store = Arc::new(InMemoryStore::new());
        store.fail_collection(Collection::Alerts);

        let live = LiveQueries::new(store.clone());
        let mut sub = live.alerts(WindowQuery::latest(50));

        let err = next_within(&mut sub).await.unwrap().unwrap_err();
        assert_eq!(err.collection, Collection::Alerts);
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_other_collections_do_not_trigger_requery() {
        let store = Arc::new(InMemoryStore::new());
        let live = LiveQueries::new(store.clone());
        let mut sub = live.sos_requests(WindowQuery::latest(50));
        next_within(&mut sub).await.unwrap().unwrap();
        let reads_after_initial = store.read_count();

        store.insert_incident(new_incident("10001")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.read_count(), reads_after_initial);
    }
}
