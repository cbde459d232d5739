//! Shared utilities for the CampusCare backend.
//!
//! This crate provides functionality used across the other crates:
//! - Password hashing with Argon2id for campus accounts
//! - Field validation for reports, SOS locations and broadcasts

pub mod password;
pub mod validation;
