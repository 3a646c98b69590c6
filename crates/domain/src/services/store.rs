//! Transactional data source interfaces.
//!
//! A [`UnitOfWork`] bundles repository operations in one transaction. Work is
//! only persisted by [`UnitOfWork::commit`]; dropping an uncommitted unit of
//! work rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    ConfigurationItem, NewSession, NewSessionLog, NewUserToken, Permission, RolePermission,
    Session, SessionEvent, User, UserToken,
};

/// Errors raised by a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserRepo: Send {
    async fn get_user_by_id(&mut self, id: Uuid) -> StoreResult<Option<User>>;

    /// Looks a user up by email address, ignoring case.
    async fn get_user_by_email(&mut self, email_address: &str) -> StoreResult<Option<User>>;

    async fn update_last_login(&mut self, user_id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;
}

#[async_trait]
pub trait TokenRepo: Send {
    async fn get_user_token_by_guid(&mut self, token: Uuid) -> StoreResult<Option<UserToken>>;

    async fn create_user_token(&mut self, token: NewUserToken) -> StoreResult<UserToken>;
}

#[async_trait]
pub trait ConfigurationRepo: Send {
    async fn get_configuration_items(&mut self) -> StoreResult<Vec<ConfigurationItem>>;
}

#[async_trait]
pub trait PermissionRepo: Send {
    async fn get_permissions(&mut self) -> StoreResult<Vec<Permission>>;

    async fn get_role_permissions(&mut self) -> StoreResult<Vec<RolePermission>>;
}

#[async_trait]
pub trait SessionRepo: Send {
    async fn get_session_events(&mut self) -> StoreResult<Vec<SessionEvent>>;

    async fn create_session(&mut self, session: NewSession) -> StoreResult<Session>;

    async fn get_session(&mut self, id: Uuid) -> StoreResult<Option<Session>>;

    /// Marks a session as ended. Returns false when no open session matched.
    async fn end_session(&mut self, id: Uuid, at: DateTime<Utc>) -> StoreResult<bool>;

    async fn add_session_log(&mut self, entry: NewSessionLog) -> StoreResult<()>;
}

/// A transactional scope over all repositories.
#[async_trait]
pub trait UnitOfWork:
    UserRepo + TokenRepo + ConfigurationRepo + PermissionRepo + SessionRepo + Send
{
    /// Persists everything done through this unit of work.
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Hands out unit-of-work scopes. Each logical operation acquires its own.
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;

    /// Cheap connectivity check for the readiness endpoint.
    async fn ping(&self) -> StoreResult<()>;
}
