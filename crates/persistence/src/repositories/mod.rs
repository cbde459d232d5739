//! Repository implementations for database operations.

pub mod alert;
pub mod incident;
pub mod notification;
pub mod push_registration;
pub mod sos_request;
pub mod user;

pub use alert::AlertRepository;
pub use incident::{IncidentInput, IncidentRepository};
pub use notification::NotificationRepository;
pub use push_registration::PushRegistrationRepository;
pub use sos_request::SosRequestRepository;
pub use user::UserRepository;
