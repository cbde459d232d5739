//! Session markers and the page guard.
//!
//! A session is nothing more than three markers in the client's storage:
//! the role, the login time and the roll number. The guard trusts the role
//! marker as-is; there is no token, expiry or server-side session.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

use super::store::{StoreError, UserStore};
use crate::models::user::LoginRequest;
use crate::models::{Role, UserAccount};

pub const ROLE_KEY: &str = "campuscareRole";
pub const LOGGED_IN_AT_KEY: &str = "campuscareLoggedInAt";
pub const ROLL_KEY: &str = "campuscareRoll";

/// All session marker keys.
pub const SESSION_KEYS: [&str; 3] = [ROLE_KEY, LOGGED_IN_AT_KEY, ROLL_KEY];

pub const MISSING_CREDENTIALS: &str = "Please enter both roll number and password.";

#[derive(Debug, Error)]
pub enum SessionError {
    /// The caller must be sent to the login page.
    #[error("{required} session required, redirecting to {location}")]
    Redirect { required: Role, location: String },

    #[error("{0}")]
    Validation(String),

    #[error("No matching account found for this roll number.")]
    UnknownAccount,

    #[error("Incorrect password. Please try again.")]
    WrongPassword,

    #[error("Credential check failed: {0}")]
    Credential(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Key-value storage holding the session markers.
pub trait SessionStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
}

/// Session storage backed by a map.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStorage {
    values: HashMap<String, String>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }
}

/// The signed-in caller, as read from the session markers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub role: Role,
    pub logged_in_at: Option<String>,
    pub roll: Option<String>,
}

impl SessionContext {
    /// Author recorded on broadcasts: roll number, else role.
    pub fn author(&self) -> String {
        self.roll
            .clone()
            .unwrap_or_else(|| self.role.as_str().to_string())
    }
}

/// Gatekeeper for role-restricted pages and endpoints.
#[derive(Debug, Clone)]
pub struct SessionGuard {
    login_page: String,
}

impl SessionGuard {
    pub fn new(login_page: impl Into<String>) -> Self {
        Self {
            login_page: login_page.into(),
        }
    }

    pub fn login_page(&self) -> &str {
        &self.login_page
    }

    /// Admits the caller only if the role marker is exactly `required`.
    pub fn require(
        &self,
        storage: &dyn SessionStorage,
        required: Role,
    ) -> Result<SessionContext, SessionError> {
        let marker = storage.get(ROLE_KEY);
        match marker.as_deref().and_then(Role::from_marker) {
            Some(role) if role == required => Ok(SessionContext {
                role,
                logged_in_at: storage.get(LOGGED_IN_AT_KEY),
                roll: storage.get(ROLL_KEY).filter(|r| !r.is_empty()),
            }),
            _ => {
                debug!(required = %required, marker = ?marker, "Session guard redirecting");
                Err(SessionError::Redirect {
                    required,
                    location: self.login_page.clone(),
                })
            }
        }
    }
}

/// Writes the session markers for `account` signed in with `roll`.
pub fn establish(storage: &mut dyn SessionStorage, account: &UserAccount, roll: &str) -> SessionContext {
    let role = account.role();
    let logged_in_at = Utc::now().timestamp_millis().to_string();

    storage.set(ROLE_KEY, role.as_str().to_string());
    storage.set(LOGGED_IN_AT_KEY, logged_in_at.clone());
    storage.set(ROLL_KEY, roll.to_string());

    SessionContext {
        role,
        logged_in_at: Some(logged_in_at),
        roll: Some(roll.to_string()),
    }
}

/// Removes all three session markers.
pub fn clear(storage: &mut dyn SessionStorage) {
    for key in SESSION_KEYS {
        storage.remove(key);
    }
}

/// Looks up the account for a roll number and checks its password.
///
/// The roll is tried as typed, then in canonical numeric form so `"0042"`
/// finds an account stored as `"42"`.
pub async fn authenticate(
    users: &dyn UserStore,
    request: &LoginRequest,
) -> Result<(UserAccount, String), SessionError> {
    let roll = request.roll_no.trim();
    let password = request.password.trim();
    if roll.is_empty() || password.is_empty() {
        return Err(SessionError::Validation(MISSING_CREDENTIALS.to_string()));
    }

    let mut account = users.find_user_by_roll(roll).await?;
    if account.is_none() {
        if let Ok(numeric) = roll.parse::<u64>() {
            let canonical = numeric.to_string();
            if canonical != roll {
                account = users.find_user_by_roll(&canonical).await?;
            }
        }
    }
    let account = account.ok_or(SessionError::UnknownAccount)?;

    let matches = shared::password::verify_password(password, &account.password_hash)
        .map_err(|e| SessionError::Credential(e.to_string()))?;
    if !matches {
        info!(roll = %roll, "Login rejected: wrong password");
        return Err(SessionError::WrongPassword);
    }

    info!(roll = %roll, role = %account.role(), "Login succeeded");
    Ok((account, roll.to_string()))
}
