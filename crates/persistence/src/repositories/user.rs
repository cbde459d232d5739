//! User account repository.

use sqlx::PgPool;

use crate::entities::UserEntity;
use crate::metrics::QueryTimer;

/// Repository for sign-in accounts.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_roll(&self, roll_no: &str) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_roll");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, roll_no, password_hash, account_type
            FROM users
            WHERE roll_no = $1
            LIMIT 1
            "#,
        )
        .bind(roll_no)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}
