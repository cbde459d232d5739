//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod alert;
pub mod incident;
pub mod notification;
pub mod push_registration;
pub mod sos_request;
pub mod user;

pub use alert::AlertEntity;
pub use incident::IncidentEntity;
pub use notification::NotificationEntity;
pub use push_registration::{FcmTokenEntity, TopicSubscriptionEntity};
pub use sos_request::SosRequestEntity;
pub use user::UserEntity;
