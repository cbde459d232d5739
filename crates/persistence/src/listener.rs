//! Change notifications from PostgreSQL.
//!
//! Every table carries a statement trigger that publishes its own name on
//! [`CHANGE_CHANNEL`]. The listener task forwards those names into the
//! store's change feed until cancelled.

use domain::services::store::Collection;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Channel the change trigger notifies on.
pub const CHANGE_CHANNEL: &str = "campuscare_changes";

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Parse a notification payload into the collection it names.
pub fn parse_payload(payload: &str) -> Option<Collection> {
    payload.trim().parse().ok()
}

/// Mark every collection changed. Notifications sent while the listener was
/// disconnected are lost, so open live queries re-read after a reconnect.
pub fn announce_all(changes: &broadcast::Sender<Collection>) {
    for collection in Collection::ALL {
        let _ = changes.send(collection);
    }
}

/// Spawn the task that forwards table change notifications into `changes`.
pub fn spawn_change_listener(
    pool: PgPool,
    changes: broadcast::Sender<Collection>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reconnecting = false;
        loop {
            let mut listener = match PgListener::connect_with(&pool).await {
                Ok(listener) => listener,
                Err(e) => {
                    warn!(error = %e, "Failed to connect change listener, retrying");
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(RECONNECT_DELAY) => continue,
                    }
                }
            };
            if let Err(e) = listener.listen(CHANGE_CHANNEL).await {
                warn!(error = %e, channel = CHANGE_CHANNEL, "Failed to LISTEN, retrying");
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(RECONNECT_DELAY) => continue,
                }
            }
            info!(channel = CHANGE_CHANNEL, "Change listener started");
            if reconnecting {
                announce_all(&changes);
            }
            reconnecting = true;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Change listener stopped");
                        return;
                    }
                    notification = listener.recv() => match notification {
                        Ok(notification) => match parse_payload(notification.payload()) {
                            Some(collection) => {
                                debug!(collection = %collection, "Change notification");
                                // No receivers simply means no live queries are open.
                                let _ = changes.send(collection);
                            }
                            None => {
                                warn!(payload = notification.payload(), "Unknown change payload");
                            }
                        },
                        Err(e) => {
                            warn!(error = %e, "Change listener connection lost, reconnecting");
                            break;
                        }
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
        }
    })
}
