//! Alert domain model: the audit log of admin broadcasts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status written on every alert row.
pub const ALERT_STATUS_BROADCAST_SENT: &str = "broadcast_sent";

/// A broadcast that was accepted by the fan-out endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub alert_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_action: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub message_id: String,
    pub status: String,
}

/// Fields of an alert about to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub title: String,
    pub message: String,
    pub alert_type: String,
    pub click_action: Option<String>,
    pub created_by: String,
    pub message_id: String,
}
