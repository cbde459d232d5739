//! Campus account domain models.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// Role of a signed-in account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Normalizes an account's stored type. Anything that is not `admin`
    /// (case-insensitive, trimmed) is a regular user.
    pub fn from_account_type(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("admin") => Role::Admin,
            _ => Role::User,
        }
    }

    /// Strict parse of a session role marker: exactly `admin` or `user`.
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }

    /// Page a freshly signed-in account is sent to.
    pub fn landing_page(&self) -> &'static str {
        match self {
            Role::Admin => "admin/admin-dashboard.html",
            Role::User => "user/user-dashboard.html",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A campus account able to sign in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: Uuid,
    pub roll_no: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Raw account type; see [`Role::from_account_type`].
    #[serde(rename = "type")]
    pub account_type: Option<String>,
}

impl UserAccount {
    pub fn role(&self) -> Role {
        Role::from_account_type(self.account_type.as_deref())
    }
}

/// Request payload for login.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(max = 64, message = "rollNo must be at most 64 characters"))]
    pub roll_no: String,

    #[serde(default)]
    #[validate(length(max = 256, message = "password must be at most 256 characters"))]
    pub password: String,
}

/// Response payload for a successful login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub role: Role,
    pub redirect_to: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_normalization() {
        assert_eq!(Role::from_account_type(Some("admin")), Role::Admin);
        assert_eq!(Role::from_account_type(Some(" ADMIN ")), Role::Admin);
        assert_eq!(Role::from_account_type(Some("student")), Role::User);
        assert_eq!(Role::from_account_type(None), Role::User);
    }

    #[test]
    fn test_marker_is_exact() {
        assert_eq!(Role::from_marker("admin"), Some(Role::Admin));
        assert_eq!(Role::from_marker("Admin"), None);
        assert_eq!(Role::from_marker(""), None);
    }

    #[test]
    fn test_landing_page() {
        assert_eq!(Role::Admin.landing_page(), "admin/admin-dashboard.html");
        assert_eq!(Role::User.landing_page(), "user/user-dashboard.html");
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let account = UserAccount {
            id: Uuid::new_v4(),
            roll_no: "21CS042".to_string(),
            password_hash: "$argon2id$...".to_string(),
            account_type: Some("user".to_string()),
        };
        let json = serde_json::to_value(&account).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["rollNo"], "21CS042");
    }
}
