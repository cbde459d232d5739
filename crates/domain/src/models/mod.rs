//! Domain models for CampusCare.

pub mod alert;
pub mod incident;
pub mod notification;
pub mod push_registration;
pub mod sos_request;
pub mod user;

pub use alert::{Alert, NewAlert};
pub use incident::{Incident, IncidentStatus, NewIncident};
pub use notification::{NewNotification, NotificationKind, NotificationRecord, NotificationStatus};
pub use push_registration::{DeviceInfo, FcmTokenRegistration, TopicSubscription};
pub use sos_request::{DashboardSosStatus, NewSosRequest, SosLocation, SosRequest, SosStatus};
pub use user::{Role, UserAccount};
