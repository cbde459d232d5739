//! View models.
//!
//! Pure functions turning stored documents into the rows each page renders,
//! plus loaders for the dashboards and the guarded admin live views.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use super::live_query::{LiveQueries, Subscription};
use super::session::{SessionError, SessionGuard, SessionStorage};
use super::store::{DocumentStore, StoreError, WindowQuery};
use crate::models::sos_request::{
    dashboard_location_label, format_sequence_id, sort_by_sequence_desc, sos_page_location_label,
};
use crate::models::{Alert, DashboardSosStatus, Incident, IncidentStatus, Role, SosRequest, SosStatus};

/// Placeholder for missing values.
const EMPTY: &str = "—";

/// Windows and caps applied by the views.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewLimits {
    /// Trailing window of the "recent incidents" counter, in days.
    pub recent_window_days: i64,
    /// How many of the newest incidents the dashboard scans for open ones.
    pub dashboard_incident_limit: usize,
    /// Cap of the SOS, alert and user dashboard queries.
    pub list_limit: usize,
    /// Cards shown on the user dashboard.
    pub user_dashboard_cards: usize,
}

impl Default for ViewLimits {
    fn default() -> Self {
        Self {
            recent_window_days: 30,
            dashboard_incident_limit: 25,
            list_limit: 50,
            user_dashboard_cards: 10,
        }
    }
}

// ============================================================================
// Text helpers
// ============================================================================

/// Relative age of a timestamp: "Just now", "N min ago", "N hr ago", then
/// the date itself.
pub fn time_ago(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = ((now - at).num_milliseconds() as f64 / 60_000.0).round() as i64;
    if minutes < 1 {
        return "Just now".to_string();
    }
    if minutes < 60 {
        return format!("{} min ago", minutes);
    }
    let hours = (minutes as f64 / 60.0).round() as i64;
    if hours < 24 {
        return format!("{} hr ago", hours);
    }
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn raw_status(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        "pending".to_string()
    } else {
        trimmed.to_lowercase()
    }
}

/// Whether a stored incident status still needs attention. `active` is
/// accepted for rows written by older clients.
pub fn is_open_incident_status(raw: &str) -> bool {
    matches!(raw_status(raw).as_str(), "pending" | "active" | "ongoing")
}

fn or_empty(value: Option<&str>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(EMPTY)
        .to_string()
}

// ============================================================================
// Admin rows
// ============================================================================

/// Row of the admin incidents table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminIncidentRow {
    pub id: Uuid,
    pub incident_id: String,
    #[serde(rename = "type")]
    pub incident_type: String,
    pub description: String,
    pub location: String,
    pub reported_by: String,
    pub status: IncidentStatus,
    pub label: &'static str,
    pub token: &'static str,
    pub created_at: DateTime<Utc>,
}

pub fn admin_incident_rows(incidents: &[Incident]) -> Vec<AdminIncidentRow> {
    incidents
        .iter()
        .map(|i| {
            let status = i.normalized_status();
            AdminIncidentRow {
                id: i.id,
                incident_id: i.display_id(),
                incident_type: i.incident_type.clone(),
                description: i.description.clone(),
                location: i.location.clone(),
                reported_by: or_empty(i.reported_by.as_deref()),
                status,
                label: status.label(),
                token: status.token(),
                created_at: i.created_at,
            }
        })
        .collect()
}

/// Row of the dashboard's ongoing incidents table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OngoingIncidentRow {
    pub id: Uuid,
    pub incident_id: String,
    #[serde(rename = "type")]
    pub incident_type: String,
    pub location: String,
    pub reported_by: String,
    pub status: String,
    pub label: &'static str,
}

/// Open incidents among `incidents`, in their given order.
pub fn dashboard_ongoing_incidents(incidents: &[Incident]) -> Vec<OngoingIncidentRow> {
    incidents
        .iter()
        .filter(|i| is_open_incident_status(&i.status))
        .map(|i| OngoingIncidentRow {
            id: i.id,
            incident_id: i.display_id(),
            incident_type: or_empty(Some(&i.incident_type)),
            location: or_empty(Some(&i.location)),
            reported_by: or_empty(i.reported_by.as_deref()),
            status: raw_status(&i.status),
            label: i.normalized_status().label(),
        })
        .collect()
}

/// SOS card on the admin dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSosRow {
    pub id: Uuid,
    pub status: DashboardSosStatus,
    pub status_label: &'static str,
    pub time_label: String,
    pub location_label: String,
}

/// Open SOS requests under the dashboard vocabulary.
pub fn dashboard_active_sos(requests: &[SosRequest], now: DateTime<Utc>) -> Vec<DashboardSosRow> {
    requests
        .iter()
        .filter_map(|r| {
            let status = DashboardSosStatus::normalize(Some(&r.status));
            status.is_open().then(|| DashboardSosRow {
                id: r.id,
                status,
                status_label: status.label(),
                time_label: time_ago(r.created_at, now),
                location_label: dashboard_location_label(r.location.as_ref()),
            })
        })
        .collect()
}

/// Row of the admin SOS table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SosPageRow {
    pub id: Uuid,
    pub sequence_id: Option<i64>,
    pub display_id: String,
    pub status: SosStatus,
    pub label: &'static str,
    pub token: &'static str,
    pub reported_by: String,
    pub location_label: String,
    pub raised_at: DateTime<Utc>,
}

/// SOS rows ordered by descending sequence id.
pub fn sos_page_rows(requests: &[SosRequest]) -> Vec<SosPageRow> {
    let mut rows: Vec<SosPageRow> = requests
        .iter()
        .map(|r| {
            let status = r.normalized_status();
            let sequence_id = r.sequence_id();
            SosPageRow {
                id: r.id,
                sequence_id: Some(sequence_id),
                display_id: format_sequence_id(sequence_id),
                status,
                label: status.label(),
                token: status.token(),
                reported_by: or_empty(r.reported_by.as_deref()),
                location_label: sos_page_location_label(r.location.as_ref()),
                raised_at: r.created_at,
            }
        })
        .collect();
    sort_by_sequence_desc(&mut rows, |row| row.sequence_id);
    rows
}

// ============================================================================
// User rows
// ============================================================================

/// Status filter of the user incidents page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentFilter {
    #[default]
    All,
    /// Pending, or `active` from older clients.
    Active,
    Ongoing,
    Resolved,
}

impl IncidentFilter {
    pub fn matches(&self, raw: &str) -> bool {
        let status = raw_status(raw);
        match self {
            IncidentFilter::All => true,
            IncidentFilter::Active => status == "pending" || status == "active",
            IncidentFilter::Ongoing => status == "ongoing",
            IncidentFilter::Resolved => status == "resolved",
        }
    }
}

impl fmt::Display for IncidentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IncidentFilter::All => "all",
            IncidentFilter::Active => "active",
            IncidentFilter::Ongoing => "ongoing",
            IncidentFilter::Resolved => "resolved",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for IncidentFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(IncidentFilter::All),
            "active" => Ok(IncidentFilter::Active),
            "ongoing" => Ok(IncidentFilter::Ongoing),
            "resolved" => Ok(IncidentFilter::Resolved),
            _ => Err(format!(
                "Invalid filter: {}. Must be one of: all, active, ongoing, resolved",
                s
            )),
        }
    }
}

/// Incident card on the user pages.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIncidentCard {
    pub id: Uuid,
    pub incident_id: String,
    #[serde(rename = "type")]
    pub incident_type: String,
    pub description: String,
    pub location: String,
    pub badge: &'static str,
    pub badge_token: &'static str,
    pub created_at: DateTime<Utc>,
}

impl From<&Incident> for UserIncidentCard {
    fn from(i: &Incident) -> Self {
        let status = i.normalized_status();
        Self {
            id: i.id,
            incident_id: i.display_id(),
            incident_type: i.incident_type.clone(),
            description: i.description.clone(),
            location: i.location.clone(),
            badge: status.badge(),
            badge_token: status.badge_token(),
            created_at: i.created_at,
        }
    }
}

pub fn user_incident_cards(incidents: &[Incident], filter: IncidentFilter) -> Vec<UserIncidentCard> {
    incidents
        .iter()
        .filter(|i| filter.matches(&i.status))
        .map(UserIncidentCard::from)
        .collect()
}

/// The most recent open incidents, at most `max`.
pub fn user_dashboard_cards(incidents: &[Incident], max: usize) -> Vec<UserIncidentCard> {
    incidents
        .iter()
        .filter(|i| is_open_incident_status(&i.status))
        .take(max)
        .map(UserIncidentCard::from)
        .collect()
}

/// One line of an incident's history log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub label: &'static str,
    pub at: DateTime<Utc>,
}

/// Detail view of one incident.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentDetail {
    #[serde(flatten)]
    pub card: UserIncidentCard,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub history: Vec<HistoryEntry>,
}

/// History log, newest first.
pub fn history_log(incident: &Incident) -> Vec<HistoryEntry> {
    let mut entries = Vec::with_capacity(3);
    if let Some(at) = incident.resolved_at {
        entries.push(HistoryEntry {
            label: "Handled At",
            at,
        });
    }
    if let Some(at) = incident.ongoing_at {
        entries.push(HistoryEntry {
            label: "Ongoing At",
            at,
        });
    }
    entries.push(HistoryEntry {
        label: "Created At",
        at: incident.created_at,
    });
    entries.sort_by(|a, b| b.at.cmp(&a.at));
    entries
}

pub fn incident_detail(incident: &Incident) -> IncidentDetail {
    IncidentDetail {
        card: UserIncidentCard::from(incident),
        notes: incident.notes.clone(),
        history: history_log(incident),
    }
}

// ============================================================================
// Loaders
// ============================================================================

/// The admin dashboard at one point in time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub recent_incident_count: usize,
    pub ongoing_incidents: Vec<OngoingIncidentRow>,
    pub active_sos_count: usize,
    pub active_sos: Vec<DashboardSosRow>,
}

/// The user dashboard at one point in time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDashboard {
    pub active_incidents: Vec<UserIncidentCard>,
}

/// Loads the dashboards from the store.
#[derive(Clone)]
pub struct DashboardLoader {
    store: Arc<dyn DocumentStore>,
    limits: ViewLimits,
}

impl DashboardLoader {
    pub fn new(store: Arc<dyn DocumentStore>, limits: ViewLimits) -> Self {
        Self { store, limits }
    }

    pub fn limits(&self) -> ViewLimits {
        self.limits
    }

    pub async fn admin_dashboard(&self) -> Result<AdminDashboard, StoreError> {
        let recent = self
            .store
            .list_incidents(WindowQuery::within(Duration::days(
                self.limits.recent_window_days,
            )))
            .await?;
        let latest = self
            .store
            .list_incidents(WindowQuery::latest(self.limits.dashboard_incident_limit))
            .await?;
        let sos = self
            .store
            .list_sos(WindowQuery::latest(self.limits.list_limit))
            .await?;

        let active_sos = dashboard_active_sos(&sos, Utc::now());
        Ok(AdminDashboard {
            recent_incident_count: recent.len(),
            ongoing_incidents: dashboard_ongoing_incidents(&latest),
            active_sos_count: active_sos.len(),
            active_sos,
        })
    }

    pub async fn user_dashboard(&self) -> Result<UserDashboard, StoreError> {
        let latest = self
            .store
            .list_incidents(WindowQuery::latest(self.limits.list_limit))
            .await?;
        Ok(UserDashboard {
            active_incidents: user_dashboard_cards(&latest, self.limits.user_dashboard_cards),
        })
    }
}

/// Admin live views. Every subscription is opened only after the session
/// guard admitted the caller as an admin.
#[derive(Clone)]
pub struct AdminLiveViews {
    guard: SessionGuard,
    live: LiveQueries,
    limits: ViewLimits,
}

impl AdminLiveViews {
    pub fn new(guard: SessionGuard, live: LiveQueries, limits: ViewLimits) -> Self {
        Self {
            guard,
            live,
            limits,
        }
    }

    /// Every incident, newest first.
    pub fn incidents(
        &self,
        session: &dyn SessionStorage,
    ) -> Result<Subscription<Incident>, SessionError> {
        self.guard.require(session, Role::Admin)?;
        Ok(self.live.incidents(WindowQuery::all()))
    }

    /// The newest incidents the dashboard scans for open ones.
    pub fn dashboard_incidents(
        &self,
        session: &dyn SessionStorage,
    ) -> Result<Subscription<Incident>, SessionError> {
        self.guard.require(session, Role::Admin)?;
        Ok(self
            .live
            .incidents(WindowQuery::latest(self.limits.dashboard_incident_limit)))
    }

    /// Incidents created within the recent window; the dashboard renders
    /// the snapshot size as its counter.
    pub fn recent_incident_count(
        &self,
        session: &dyn SessionStorage,
    ) -> Result<Subscription<Incident>, SessionError> {
        self.guard.require(session, Role::Admin)?;
        Ok(self.live.incidents(WindowQuery::within(Duration::days(
            self.limits.recent_window_days,
        ))))
    }

    /// The newest SOS requests, for the dashboard's active cards.
    pub fn dashboard_sos(
        &self,
        session: &dyn SessionStorage,
    ) -> Result<Subscription<SosRequest>, SessionError> {
        self.guard.require(session, Role::Admin)?;
        Ok(self
            .live
            .sos_requests(WindowQuery::latest(self.limits.list_limit)))
    }

    pub fn sos_requests(
        &self,
        session: &dyn SessionStorage,
    ) -> Result<Subscription<SosRequest>, SessionError> {
        self.guard.require(session, Role::Admin)?;
        Ok(self
            .live
            .sos_requests(WindowQuery::latest(self.limits.list_limit)))
    }

    pub fn alerts(&self, session: &dyn SessionStorage) -> Result<Subscription<Alert>, SessionError> {
        self.guard.require(session, Role::Admin)?;
        Ok(self.live.alerts(WindowQuery::latest(self.limits.list_limit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SosLocation;
    use crate::services::memory::InMemoryStore;
    use crate::services::session::{MemorySessionStorage, ROLE_KEY};

    fn incident(number: &str, status: &str, minutes_ago: i64) -> Incident {
        Incident {
            id: Uuid::new_v4(),
            incident_id: number.to_string(),
            incident_type: "Other".to_string(),
            description: "Something".to_string(),
            location: "Somewhere".to_string(),
            reported_by: None,
            status: status.to_string(),
            notes: None,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
            updated_at: None,
            ongoing_at: None,
            resolved_at: None,
        }
    }

    fn sos(request_id: i64, display_id: Option<i64>, status: &str) -> SosRequest {
        SosRequest {
            id: Uuid::new_v4(),
            request_id,
            display_id,
            status: status.to_string(),
            location: None,
            reported_by: Some("21CS042".to_string()),
            source: "user-dashboard".to_string(),
            created_at: Utc::now(),
            updated_at: None,
            handled_at: None,
        }
    }

    #[test]
    fn test_time_ago() {
        let now = Utc::now();
        assert_eq!(time_ago(now - Duration::seconds(20), now), "Just now");
        assert_eq!(time_ago(now - Duration::minutes(5), now), "5 min ago");
        assert_eq!(time_ago(now - Duration::minutes(59), now), "59 min ago");
        assert_eq!(time_ago(now - Duration::minutes(150), now), "3 hr ago");
        let old = now - Duration::days(3);
        assert_eq!(
            time_ago(old, now),
            old.format("%Y-%m-%d %H:%M UTC").to_string()
        );
    }

    #[test]
    fn test_dashboard_ongoing_filter() {
        let rows = dashboard_ongoing_incidents(&[
            incident("10004", "resolved", 1),
            incident("10003", "ongoing", 2),
            incident("10002", "ACTIVE", 3),
            incident("10001", "", 4),
        ]);
        let ids: Vec<_> = rows.iter().map(|r| r.incident_id.as_str()).collect();
        assert_eq!(ids, vec!["10003", "10002", "10001"]);
        assert_eq!(rows[2].label, "Active");
    }

    #[test]
    fn test_dashboard_active_sos_uses_dashboard_vocabulary() {
        let mut located = sos(1003, None, "active");
        located.location = Some(SosLocation {
            latitude: Some(1.0),
            longitude: Some(2.0),
            accuracy: None,
            address: None,
        });
        let rows = dashboard_active_sos(
            &[sos(1001, None, "handled"), sos(1002, None, "pending"), located],
            Utc::now(),
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status_label, "Waiting for response");
        assert_eq!(rows[1].status_label, "Active");
        assert_eq!(rows[1].location_label, "Location: 1.00000, 2.00000");
        assert_eq!(rows[0].location_label, "Location: not shared");
    }

    #[test]
    fn test_sos_page_rows_sorted_by_sequence() {
        let rows = sos_page_rows(&[
            sos(1003, None, "pending"),
            sos(1001, None, "handled"),
            sos(1002, None, "ongoing"),
        ]);
        let ids: Vec<_> = rows.iter().map(|r| r.display_id.as_str()).collect();
        assert_eq!(ids, vec!["1003", "1002", "1001"]);
        assert_eq!(rows[2].token, "resolved");
        assert_eq!(rows[2].label, "Handled");
    }

    #[test]
    fn test_sos_page_prefers_display_id() {
        let rows = sos_page_rows(&[sos(1001, Some(7), "pending"), sos(1002, None, "pending")]);
        assert_eq!(rows[0].display_id, "1002");
        assert_eq!(rows[1].display_id, "0007");
    }

    #[test]
    fn test_user_filters() {
        let incidents = [
            incident("10001", "pending", 1),
            incident("10002", "active", 2),
            incident("10003", "ongoing", 3),
            incident("10004", "resolved", 4),
        ];
        assert_eq!(user_incident_cards(&incidents, IncidentFilter::All).len(), 4);
        assert_eq!(
            user_incident_cards(&incidents, IncidentFilter::Active).len(),
            2
        );
        let resolved = user_incident_cards(&incidents, IncidentFilter::Resolved);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].badge, "Resolved");
        assert_eq!(
            user_incident_cards(&incidents, IncidentFilter::Ongoing)[0].badge,
            "In Progress"
        );
        assert!("closed".parse::<IncidentFilter>().is_err());
    }

    #[test]
    fn test_user_dashboard_caps_open_cards() {
        let incidents: Vec<_> = (0..15)
            .map(|n| incident(&format!("{:05}", 10001 + n), "pending", n))
            .collect();
        assert_eq!(user_dashboard_cards(&incidents, 10).len(), 10);
    }

    #[test]
    fn test_history_log_newest_first() {
        let mut i = incident("10001", "resolved", 60);
        i.ongoing_at = Some(i.created_at + Duration::minutes(10));
        i.resolved_at = Some(i.created_at + Duration::minutes(30));

        let labels: Vec<_> = history_log(&i).iter().map(|e| e.label).collect();
        assert_eq!(labels, vec!["Handled At", "Ongoing At", "Created At"]);

        let fresh = incident("10002", "pending", 0);
        assert_eq!(history_log(&fresh).len(), 1);
    }

    #[tokio::test]
    async fn test_admin_dashboard_counts_recent_window() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_incident(incident("10001", "pending", 60 * 24 * 40));
        store.seed_incident(incident("10002", "ongoing", 10));
        store.seed_incident(incident("10003", "resolved", 5));
        store.seed_sos(sos(1001, None, "pending"));
        store.seed_sos(sos(1002, None, "handled"));

        let loader = DashboardLoader::new(store.clone(), ViewLimits::default());
        let dashboard = loader.admin_dashboard().await.unwrap();

        assert_eq!(dashboard.recent_incident_count, 2);
        assert_eq!(dashboard.ongoing_incidents.len(), 2);
        assert_eq!(dashboard.active_sos_count, 1);
    }

    #[tokio::test]
    async fn test_admin_views_redirect_before_subscribing() {
        let store = Arc::new(InMemoryStore::new());
        let views = AdminLiveViews::new(
            SessionGuard::new("/login.html"),
            LiveQueries::new(store.clone()),
            ViewLimits::default(),
        );

        let anonymous = MemorySessionStorage::new();
        assert!(matches!(
            views.incidents(&anonymous),
            Err(SessionError::Redirect { .. })
        ));

        let mut user = MemorySessionStorage::new();
        user.set(ROLE_KEY, "user".to_string());
        assert!(views.sos_requests(&user).is_err());
        assert!(views.alerts(&user).is_err());
        assert!(views.recent_incident_count(&user).is_err());
        assert!(views.dashboard_sos(&user).is_err());

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(store.read_count(), 0);

        let mut admin = MemorySessionStorage::new();
        admin.set(ROLE_KEY, "admin".to_string());
        let mut sub = views.incidents(&admin).unwrap();
        assert!(sub.next().await.unwrap().is_ok());
        assert_eq!(store.read_count(), 1);
    }

    #[tokio::test]
    async fn test_recent_incident_count_follows_window() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_incident(incident("10001", "pending", 60 * 24 * 40));
        store.seed_incident(incident("10002", "ongoing", 10));
        let views = AdminLiveViews::new(
            SessionGuard::new("/login.html"),
            LiveQueries::new(store.clone()),
            ViewLimits::default(),
        );
        let mut admin = MemorySessionStorage::new();
        admin.set(ROLE_KEY, "admin".to_string());

        let mut sub = views.recent_incident_count(&admin).unwrap();
        assert_eq!(sub.next().await.unwrap().unwrap().len(), 1);

        store.seed_incident(incident("10003", "pending", 0));
        assert_eq!(sub.next().await.unwrap().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_dashboard_sos_snapshot_renders_open_cards() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_sos(sos(1001, None, "pending"));
        store.seed_sos(sos(1002, None, "handled"));
        let views = AdminLiveViews::new(
            SessionGuard::new("/login.html"),
            LiveQueries::new(store.clone()),
            ViewLimits::default(),
        );
        let mut admin = MemorySessionStorage::new();
        admin.set(ROLE_KEY, "admin".to_string());

        let mut sub = views.dashboard_sos(&admin).unwrap();
        let snapshot = sub.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 2);
        let cards = dashboard_active_sos(&snapshot, Utc::now());
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].status_label, "Waiting for response");
    }
}
