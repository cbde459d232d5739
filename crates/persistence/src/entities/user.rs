//! User account entity (database row mapping).

use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub roll_no: String,
    pub password_hash: String,
    pub account_type: Option<String>,
}

impl From<UserEntity> for domain::models::UserAccount {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            roll_no: entity.roll_no,
            password_hash: entity.password_hash,
            account_type: entity.account_type,
        }
    }
}
