use anyhow::{Context, Result};
use domain::services::{InMemoryStore, MockPushGateway, PushGateway};
use persistence::listener::spawn_change_listener;
use persistence::PgStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use campuscare_api::app::{create_app, AppState};
use campuscare_api::config::{Config, StorageBackend};
use campuscare_api::middleware::{init_metrics, logging::init_logging};
use campuscare_api::services::FcmPushGateway;

const POOL_METRICS_INTERVAL: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;

    init_logging(&config.logging).context("Failed to initialize logging")?;
    init_metrics().context("Failed to install metrics recorder")?;

    info!("Starting CampusCare API v{}", env!("CARGO_PKG_VERSION"));

    let shutdown = CancellationToken::new();

    let push: Arc<dyn PushGateway> = if config.fcm.enabled {
        Arc::new(FcmPushGateway::new(config.fcm.clone()).context("Failed to set up FCM")?)
    } else {
        warn!("FCM disabled, push notifications will only be logged");
        Arc::new(MockPushGateway::new())
    };

    let state = match config.storage.backend {
        StorageBackend::Postgres => {
            let pool = persistence::db::create_pool(&config.database.pool_config())
                .await
                .context("Failed to connect to database")?;

            info!("Running database migrations...");
            persistence::db::run_migrations(&pool).await?;
            info!("Migrations completed");

            let store = Arc::new(PgStore::new(pool.clone()));
            spawn_change_listener(pool.clone(), store.change_sender(), shutdown.clone());
            spawn_pool_metrics(pool.clone(), shutdown.clone());

            AppState::new(config.clone(), store, push, Some(pool))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage, data will not survive a restart");
            AppState::new(config.clone(), Arc::new(InMemoryStore::new()), push, None)
        }
    };

    let app = create_app(state.with_shutdown(shutdown.clone()));

    let addr = config.socket_addr().context("Invalid server address")?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    info!("Server stopped");
    Ok(())
}

fn spawn_pool_metrics(pool: sqlx::PgPool, cancel: CancellationToken) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(POOL_METRICS_INTERVAL);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => persistence::metrics::record_pool_metrics(&pool),
            }
        }
    });
}

/// Resolves on Ctrl+C or SIGTERM and cancels background tasks and open
/// live streams.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    cancel.cancel();
}
