//! External service integrations.

pub mod cookies;
pub mod fcm;

pub use cookies::{CookieHelper, CookieSessionStorage};
pub use fcm::FcmPushGateway;
