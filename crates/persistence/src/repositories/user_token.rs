//! User token repository.

use domain::models::NewUserToken;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::entities::UserTokenEntity;
use crate::metrics::QueryTimer;

/// Repository for single-use user tokens.
pub struct UserTokenRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> UserTokenRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Find a token by its value, whatever its purpose.
    pub async fn find_by_token(
        &mut self,
        token: Uuid,
    ) -> Result<Option<UserTokenEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_token");
        let result = sqlx::query_as::<_, UserTokenEntity>(
            r#"
            SELECT id, user_id, token, token_type_id, created_by, created_at
            FROM user_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&mut *self.conn)
        .await;
        timer.record(&result);
        result
    }

    /// Insert a token. The UNIQUE constraint on `token` rejects duplicates.
    pub async fn create(&mut self, token: &NewUserToken) -> Result<UserTokenEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_user_token");
        let result = sqlx::query_as::<_, UserTokenEntity>(
            r#"
            INSERT INTO user_tokens (user_id, token, token_type_id, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, token, token_type_id, created_by, created_at
            "#,
        )
        .bind(token.user_id)
        .bind(token.token)
        .bind(token.token_type.id())
        .bind(token.created_by)
        .fetch_one(&mut *self.conn)
        .await;
        timer.record(&result);
        result
    }
}
