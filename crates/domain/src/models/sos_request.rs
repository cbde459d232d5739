//! SOS request domain model.
//!
//! Two status vocabularies exist for SOS requests and they are deliberately
//! kept apart: [`SosStatus`] is what admins can set, [`DashboardSosStatus`]
//! is what the dashboard recognizes when reading, which also knows `active`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Source tag written on SOS requests raised from the user dashboard.
pub const SOURCE_USER_DASHBOARD: &str = "user-dashboard";

// ============================================================================
// Status vocabularies
// ============================================================================

/// Admin vocabulary for SOS requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SosStatus {
    Pending,
    Ongoing,
    Handled,
}

impl SosStatus {
    /// Returns the string representation for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            SosStatus::Pending => "pending",
            SosStatus::Ongoing => "ongoing",
            SosStatus::Handled => "handled",
        }
    }

    /// Lenient normalization of a stored status value.
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("ongoing") => SosStatus::Ongoing,
            Some("handled") => SosStatus::Handled,
            _ => SosStatus::Pending,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SosStatus::Pending => "Active",
            SosStatus::Ongoing => "Ongoing",
            SosStatus::Handled => "Handled",
        }
    }

    /// Style token. Handled requests share the `resolved` styling.
    pub fn token(&self) -> &'static str {
        match self {
            SosStatus::Pending => "active",
            SosStatus::Ongoing => "ongoing",
            SosStatus::Handled => "resolved",
        }
    }
}

impl fmt::Display for SosStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SosStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SosStatus::Pending),
            "ongoing" => Ok(SosStatus::Ongoing),
            "handled" => Ok(SosStatus::Handled),
            _ => Err(format!(
                "Invalid SOS status: {}. Must be one of: pending, ongoing, handled",
                s
            )),
        }
    }
}

/// Style token for a raw stored SOS status value.
pub fn status_token(raw: Option<&str>) -> &'static str {
    SosStatus::normalize(raw).token()
}

/// Dashboard vocabulary for SOS requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardSosStatus {
    Pending,
    Active,
    Ongoing,
    Handled,
}

impl DashboardSosStatus {
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("handled") => DashboardSosStatus::Handled,
            Some("ongoing") => DashboardSosStatus::Ongoing,
            Some("active") => DashboardSosStatus::Active,
            _ => DashboardSosStatus::Pending,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DashboardSosStatus::Pending => "Waiting for response",
            DashboardSosStatus::Active => "Active",
            DashboardSosStatus::Ongoing => "Ongoing",
            DashboardSosStatus::Handled => "Handled",
        }
    }

    /// Whether the request still needs attention.
    pub fn is_open(&self) -> bool {
        !matches!(self, DashboardSosStatus::Handled)
    }
}

// ============================================================================
// Core Model
// ============================================================================

/// Where an SOS was raised from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SosLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "shared::validation::validate_accuracy"))]
    pub accuracy: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500, message = "address must be at most 500 characters"))]
    pub address: Option<String>,
}

impl SosLocation {
    fn coordinates_text(&self) -> Option<String> {
        let (lat, lon) = (self.latitude?, self.longitude?);
        let accuracy = match self.accuracy {
            Some(acc) if acc > 0.0 => format!(" (±{}m)", acc.round() as i64),
            _ => String::new(),
        };
        Some(format!("{:.5}, {:.5}{}", lat, lon, accuracy))
    }
}

/// Location label on the admin dashboard.
pub fn dashboard_location_label(location: Option<&SosLocation>) -> String {
    match location {
        None => "Location: not shared".to_string(),
        Some(loc) => match loc.coordinates_text() {
            Some(text) => format!("Location: {}", text),
            None => "Location: provided".to_string(),
        },
    }
}

/// Location label on the admin SOS page, which prefers a street address.
pub fn sos_page_location_label(location: Option<&SosLocation>) -> String {
    match location {
        None => "Location: not shared".to_string(),
        Some(loc) => {
            if let Some(address) = loc.address.as_deref().filter(|a| !a.is_empty()) {
                return address.to_string();
            }
            loc.coordinates_text()
                .unwrap_or_else(|| "Location: provided".to_string())
        }
    }
}

/// An SOS raised by a campus user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosRequest {
    pub id: Uuid,
    pub request_id: i64,
    /// Optional numeric override used for ordering and display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_id: Option<i64>,
    /// Raw status as stored.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SosLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_by: Option<String>,
    pub source: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handled_at: Option<DateTime<Utc>>,
}

impl SosRequest {
    pub fn normalized_status(&self) -> SosStatus {
        SosStatus::normalize(Some(&self.status))
    }

    /// The id shown and sorted on: `displayId` when set, else `requestId`.
    pub fn sequence_id(&self) -> i64 {
        self.display_id.unwrap_or(self.request_id)
    }
}

/// Fields of an SOS request about to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSosRequest {
    pub request_id: i64,
    pub location: Option<SosLocation>,
    pub reported_by: Option<String>,
    pub source: String,
}

/// Request payload for raising an SOS.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSosRequest {
    #[validate(nested)]
    pub location: Option<SosLocation>,
}

// ============================================================================
// Ordering
// ============================================================================

/// Descending order on sequence ids. Rows without a numeric id compare equal
/// to everything.
pub fn compare_sequence_desc(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        _ => Ordering::Equal,
    }
}

/// Stable sort by descending sequence id.
///
/// `compare_sequence_desc` is not a total order once ids are missing, which
/// `slice::sort_by` is allowed to panic on, so this is a plain insertion sort.
pub fn sort_by_sequence_desc<T>(rows: &mut [T], key: impl Fn(&T) -> Option<i64>) {
    for i in 1..rows.len() {
        let mut j = i;
        while j > 0 && compare_sequence_desc(key(&rows[j - 1]), key(&rows[j])) == Ordering::Greater
        {
            rows.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Display form of a sequence id, padded to four digits.
pub fn format_sequence_id(id: i64) -> String {
    format!("{:04}", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_token() {
        assert_eq!(status_token(Some("handled")), "resolved");
        assert_eq!(status_token(Some("ongoing")), "ongoing");
        assert_eq!(status_token(Some("pending")), "active");
        assert_eq!(status_token(Some("active")), "active");
        assert_eq!(status_token(Some("whatever")), "active");
        assert_eq!(status_token(None), "active");
    }

    #[test]
    fn test_admin_vocabulary_rejects_active() {
        assert!("active".parse::<SosStatus>().is_err());
        assert_eq!("handled".parse::<SosStatus>().unwrap(), SosStatus::Handled);
    }

    #[test]
    fn test_dashboard_vocabulary() {
        assert_eq!(
            DashboardSosStatus::normalize(Some("active")),
            DashboardSosStatus::Active
        );
        assert_eq!(
            DashboardSosStatus::normalize(None).label(),
            "Waiting for response"
        );
        assert_eq!(DashboardSosStatus::Ongoing.label(), "Ongoing");
        assert!(!DashboardSosStatus::Handled.is_open());
        assert!(DashboardSosStatus::Active.is_open());
    }

    #[test]
    fn test_sort_by_sequence_desc() {
        let mut ids = vec![Some(1003), Some(1001), Some(1002)];
        sort_by_sequence_desc(&mut ids, |id| *id);
        assert_eq!(ids, vec![Some(1003), Some(1002), Some(1001)]);
    }

    #[test]
    fn test_sort_keeps_non_numeric_in_place() {
        let mut rows = vec![(None, "a"), (Some(1001), "b"), (None, "c")];
        sort_by_sequence_desc(&mut rows, |r| r.0);
        assert_eq!(rows, vec![(None, "a"), (Some(1001), "b"), (None, "c")]);
    }

    #[test]
    fn test_format_sequence_id() {
        assert_eq!(format_sequence_id(7), "0007");
        assert_eq!(format_sequence_id(1001), "1001");
        assert_eq!(format_sequence_id(12345), "12345");
    }

    #[test]
    fn test_location_labels() {
        assert_eq!(dashboard_location_label(None), "Location: not shared");

        let coords = SosLocation {
            latitude: Some(12.971598),
            longitude: Some(77.594566),
            accuracy: Some(14.6),
            address: None,
        };
        assert_eq!(
            dashboard_location_label(Some(&coords)),
            "Location: 12.97160, 77.59457 (±15m)"
        );
        assert_eq!(
            sos_page_location_label(Some(&coords)),
            "12.97160, 77.59457 (±15m)"
        );

        let address = SosLocation {
            address: Some("Hostel B, Room 12".to_string()),
            ..Default::default()
        };
        assert_eq!(sos_page_location_label(Some(&address)), "Hostel B, Room 12");
        assert_eq!(dashboard_location_label(Some(&address)), "Location: provided");
    }

    #[test]
    fn test_location_validation() {
        let bad = SosLocation {
            latitude: Some(95.0),
            longitude: Some(10.0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let request = TriggerSosRequest {
            location: Some(SosLocation {
                accuracy: Some(-3.0),
                ..Default::default()
            }),
        };
        assert!(request.validate().is_err());
    }
}
