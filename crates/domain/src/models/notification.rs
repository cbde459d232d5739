//! Notification history records.
//!
//! One table holds what three different writers produce: topic broadcasts,
//! targeted multicasts and the "report resolved" notice queued for reporters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Which writer produced a notification record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Broadcast,
    Targeted,
    ReportResolved,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Broadcast => "broadcast",
            NotificationKind::Targeted => "targeted",
            NotificationKind::ReportResolved => "report_resolved",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "broadcast" => Ok(NotificationKind::Broadcast),
            "targeted" => Ok(NotificationKind::Targeted),
            "report_resolved" => Ok(NotificationKind::ReportResolved),
            _ => Err(format!("Invalid notification kind: {}", s)),
        }
    }
}

/// Delivery outcome of a notification record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Sent,
    Failed,
    /// Written for a downstream sender to pick up.
    Queued,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
            NotificationStatus::Queued => "queued",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(NotificationStatus::Sent),
            "failed" => Ok(NotificationStatus::Failed),
            "queued" => Ok(NotificationStatus::Queued),
            _ => Err(format!("Invalid notification status: {}", s)),
        }
    }
}

/// A stored notification record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
    pub status: NotificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub target_tokens: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_id: Option<Uuid>,
    pub sent_at: DateTime<Utc>,
}

/// Fields of a notification record about to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
    pub status: NotificationStatus,
    pub message_id: Option<String>,
    pub error: Option<String>,
    pub target_tokens: Vec<String>,
    pub success_count: Option<i32>,
    pub failure_count: Option<i32>,
    pub user_id: Option<String>,
    pub report_id: Option<Uuid>,
}

impl NewNotification {
    /// A record with only the required fields set.
    pub fn new(
        kind: NotificationKind,
        status: NotificationStatus,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            body: body.into(),
            data: BTreeMap::new(),
            status,
            message_id: None,
            error: None,
            target_tokens: Vec::new(),
            success_count: None,
            failure_count: None,
            user_id: None,
            report_id: None,
        }
    }
}
