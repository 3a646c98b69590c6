//! Session entities.

use chrono::{DateTime, Utc};
use domain::models::{Session, SessionEvent};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the sessions table.
#[derive(Debug, Clone, FromRow)]
pub struct SessionEntity {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<SessionEntity> for Session {
    fn from(entity: SessionEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            created_at: entity.created_at,
            expires_at: entity.expires_at,
            ended_at: entity.ended_at,
        }
    }
}

/// Database row mapping for the session_events lookup table.
#[derive(Debug, Clone, FromRow)]
pub struct SessionEventEntity {
    pub id: i32,
    pub key: String,
    pub description: String,
}

impl From<SessionEventEntity> for SessionEvent {
    fn from(entity: SessionEventEntity) -> Self {
        Self {
            id: entity.id,
            key: entity.key,
            description: entity.description,
        }
    }
}
