//! User and user token entities.

use chrono::{DateTime, Utc};
use domain::models::{TokenType, User, UserToken};
use domain::services::StoreError;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub email_address: String,
    pub display_name: String,
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<UserEntity> for User {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            email_address: entity.email_address,
            display_name: entity.display_name,
            password_hash: entity.password_hash,
            is_active: entity.is_active,
            email_verified: entity.email_verified,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            last_login_at: entity.last_login_at,
        }
    }
}

/// Database row mapping for the user_tokens table.
#[derive(Debug, Clone, FromRow)]
pub struct UserTokenEntity {
    pub id: i64,
    pub user_id: Uuid,
    pub token: Uuid,
    pub token_type_id: i16,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserTokenEntity> for UserToken {
    type Error = StoreError;

    fn try_from(entity: UserTokenEntity) -> Result<Self, Self::Error> {
        let token_type = TokenType::from_id(entity.token_type_id)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self {
            id: entity.id,
            user_id: entity.user_id,
            token: entity.token,
            token_type,
            created_by: entity.created_by,
            created_at: entity.created_at,
        })
    }
}
