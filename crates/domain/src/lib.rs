//! Domain layer for the CampusCare incident service.
//!
//! This crate contains:
//! - Domain models (Incident, SosRequest, Alert, NotificationRecord)
//! - Store traits and the in-memory store
//! - Business logic services (status lifecycle, live queries, broadcasts,
//!   messaging, sessions, intake, view models)

pub mod models;
pub mod services;
