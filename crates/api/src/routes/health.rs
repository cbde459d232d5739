//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::app::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub storage: StorageHealth,
    pub push_enabled: bool,
}

/// Backing store health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct StorageHealth {
    pub backend: String,
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

/// Simple status response for liveness and readiness checks.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Checks the database when one is configured. The in-memory store is
/// always reachable.
async fn check_storage(state: &AppState) -> StorageHealth {
    match &state.pool {
        Some(pool) => {
            let start = std::time::Instant::now();
            let connected = sqlx::query("SELECT 1").execute(pool).await.is_ok();
            StorageHealth {
                backend: "postgres".to_string(),
                connected,
                latency_ms: connected.then(|| start.elapsed().as_millis() as u64),
            }
        }
        None => StorageHealth {
            backend: "memory".to_string(),
            connected: true,
            latency_ms: None,
        },
    }
}

/// Full health check endpoint.
///
/// GET /api/health
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let storage = check_storage(&state).await;
    if !storage.connected {
        tracing::warn!(backend = %storage.backend, "Health check: storage unreachable");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage,
        push_enabled: state.config.fcm.enabled,
    }))
}

/// Liveness endpoint.
///
/// Returns 200 OK if the process is running.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

/// Readiness endpoint.
///
/// Returns 200 OK if the backing store is reachable.
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    if check_storage(&state).await.connected {
        Ok(Json(StatusResponse {
            status: "ready".to_string(),
        }))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
