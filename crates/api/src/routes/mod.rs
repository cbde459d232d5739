//! HTTP route handlers.

pub mod alerts;
pub mod auth;
pub mod dashboard;
pub mod functions;
pub mod health;
pub mod incidents;
pub mod live;
pub mod push;
pub mod sos;
