//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::entities::UserEntity;
use crate::metrics::QueryTimer;

/// Repository for user-related database operations.
pub struct UserRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> UserRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&mut self, id: Uuid) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_id");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, email_address, display_name, password_hash, is_active, email_verified,
                   created_at, updated_at, last_login_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await;
        timer.record(&result);
        result
    }

    /// Find a user by email address (case-insensitive).
    pub async fn find_by_email(
        &mut self,
        email_address: &str,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_email");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, email_address, display_name, password_hash, is_active, email_verified,
                   created_at, updated_at, last_login_at
            FROM users
            WHERE LOWER(email_address) = LOWER($1)
            "#,
        )
        .bind(email_address.trim())
        .fetch_optional(&mut *self.conn)
        .await;
        timer.record(&result);
        result
    }

    /// Update the user's last login timestamp.
    pub async fn update_last_login(
        &mut self,
        user_id: Uuid,
        last_login_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("update_user_last_login");
        let result = sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(last_login_at)
        .bind(user_id)
        .execute(&mut *self.conn)
        .await;
        timer.record(&result);
        result.map(|_| ())
    }
}
