//! Incident domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

// ============================================================================
// Status
// ============================================================================

/// Progress of an incident report.
///
/// The store keeps the raw status string; this enum is the normalized view of
/// it. Absent or unrecognized values normalize to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Pending,
    Ongoing,
    Resolved,
}

impl IncidentStatus {
    /// Returns the string representation for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Pending => "pending",
            IncidentStatus::Ongoing => "ongoing",
            IncidentStatus::Resolved => "resolved",
        }
    }

    /// Lenient normalization of a stored status value.
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("ongoing") => IncidentStatus::Ongoing,
            Some("resolved") => IncidentStatus::Resolved,
            _ => IncidentStatus::Pending,
        }
    }

    /// Admin-facing label. Pending incidents are shown as "Active".
    pub fn label(&self) -> &'static str {
        match self {
            IncidentStatus::Pending => "Active",
            IncidentStatus::Ongoing => "Ongoing",
            IncidentStatus::Resolved => "Resolved",
        }
    }

    /// Style token used by status pills and selects.
    pub fn token(&self) -> &'static str {
        match self {
            IncidentStatus::Pending => "active",
            IncidentStatus::Ongoing => "ongoing",
            IncidentStatus::Resolved => "resolved",
        }
    }

    /// Badge text on the reporter's incident list.
    pub fn badge(&self) -> &'static str {
        match self {
            IncidentStatus::Pending => "New",
            IncidentStatus::Ongoing => "In Progress",
            IncidentStatus::Resolved => "Resolved",
        }
    }

    /// Badge style token on the reporter's incident list.
    pub fn badge_token(&self) -> &'static str {
        match self {
            IncidentStatus::Pending => "new",
            IncidentStatus::Ongoing => "progress",
            IncidentStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IncidentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(IncidentStatus::Pending),
            "ongoing" => Ok(IncidentStatus::Ongoing),
            "resolved" => Ok(IncidentStatus::Resolved),
            _ => Err(format!(
                "Invalid incident status: {}. Must be one of: pending, ongoing, resolved",
                s
            )),
        }
    }
}

/// Label for a raw stored status value.
pub fn status_label(raw: Option<&str>) -> &'static str {
    IncidentStatus::normalize(raw).label()
}

// ============================================================================
// Core Model
// ============================================================================

/// An incident filed by a campus user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: Uuid,
    /// Human-facing number, zero-padded to five digits.
    pub incident_id: String,
    #[serde(rename = "type")]
    pub incident_type: String,
    pub description: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_by: Option<String>,
    /// Raw status as stored; see [`IncidentStatus::normalize`].
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ongoing_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Incident {
    pub fn normalized_status(&self) -> IncidentStatus {
        IncidentStatus::normalize(Some(&self.status))
    }

    /// Identifier used when addressing the reporter: the incident number,
    /// or the document id for legacy rows without one.
    pub fn display_id(&self) -> String {
        if self.incident_id.is_empty() {
            self.id.to_string()
        } else {
            self.incident_id.clone()
        }
    }
}

/// Fields of an incident about to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIncident {
    pub incident_id: String,
    pub incident_type: String,
    pub description: String,
    pub location: String,
    pub reported_by: Option<String>,
    pub notes: Option<String>,
}

// ============================================================================
// Request DTOs
// ============================================================================

/// Request payload for reporting an issue.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReportIssueRequest {
    #[serde(rename = "type")]
    #[validate(length(max = 100, message = "type must be at most 100 characters"))]
    pub incident_type: Option<String>,

    #[serde(default)]
    #[validate(length(max = 2000, message = "description must be at most 2000 characters"))]
    pub description: String,

    #[serde(default)]
    #[validate(length(max = 500, message = "location must be at most 500 characters"))]
    pub location: String,

    #[validate(length(max = 2000, message = "notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

/// Request payload for an admin status change.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: String,
}
