//! Persistence layer for CampusCare.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - [`PgStore`], the PostgreSQL document store, and its change listener

pub mod db;
pub mod entities;
pub mod listener;
pub mod metrics;
pub mod repositories;
pub mod store;

pub use store::PgStore;
