//! Database connection pool and the PostgreSQL unit of work.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;
use uuid::Uuid;

use domain::models::{
    ConfigurationItem, NewSession, NewSessionLog, NewUserToken, Permission, RolePermission,
    Session, SessionEvent, User, UserToken,
};
use domain::services::{
    ConfigurationRepo, PermissionRepo, SessionRepo, StoreError, StoreResult, TokenRepo,
    UnitOfWork, UnitOfWorkFactory, UserRepo,
};

use crate::repositories::{
    ConfigurationRepository, PermissionRepository, SessionRepository, UserRepository,
    UserTokenRepository,
};

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// Creates a PostgreSQL connection pool with the given configuration.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database pool created"
    );
    Ok(pool)
}

/// Maps driver errors, turning unique violations into conflicts.
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    let unique_violation = err
        .as_database_error()
        .and_then(|db_err| db_err.code())
        .map(|code| code == "23505")
        .unwrap_or(false);

    if unique_violation {
        StoreError::Conflict(err.to_string())
    } else {
        StoreError::Database(err)
    }
}

/// Opens one transaction per unit of work.
#[derive(Clone)]
pub struct PgUnitOfWorkFactory {
    pool: PgPool,
}

impl PgUnitOfWorkFactory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UnitOfWorkFactory for PgUnitOfWorkFactory {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await.map_err(store_error)?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

/// A unit of work backed by a PostgreSQL transaction.
///
/// sqlx rolls the transaction back when it is dropped without a commit.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UserRepo for PgUnitOfWork {
    async fn get_user_by_id(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        let entity = UserRepository::new(&mut self.tx)
            .find_by_id(id)
            .await
            .map_err(store_error)?;
        Ok(entity.map(Into::into))
    }

    async fn get_user_by_email(&mut self, email_address: &str) -> StoreResult<Option<User>> {
        let entity = UserRepository::new(&mut self.tx)
            .find_by_email(email_address)
            .await
            .map_err(store_error)?;
        Ok(entity.map(Into::into))
    }

    async fn update_last_login(&mut self, user_id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        UserRepository::new(&mut self.tx)
            .update_last_login(user_id, at)
            .await
            .map_err(store_error)
    }
}

#[async_trait]
impl TokenRepo for PgUnitOfWork {
    async fn get_user_token_by_guid(&mut self, token: Uuid) -> StoreResult<Option<UserToken>> {
        UserTokenRepository::new(&mut self.tx)
            .find_by_token(token)
            .await
            .map_err(store_error)?
            .map(UserToken::try_from)
            .transpose()
    }

    async fn create_user_token(&mut self, token: NewUserToken) -> StoreResult<UserToken> {
        let entity = UserTokenRepository::new(&mut self.tx)
            .create(&token)
            .await
            .map_err(store_error)?;
        UserToken::try_from(entity)
    }
}

#[async_trait]
impl ConfigurationRepo for PgUnitOfWork {
    async fn get_configuration_items(&mut self) -> StoreResult<Vec<ConfigurationItem>> {
        let rows = ConfigurationRepository::new(&mut self.tx)
            .list_items()
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl PermissionRepo for PgUnitOfWork {
    async fn get_permissions(&mut self) -> StoreResult<Vec<Permission>> {
        let rows = PermissionRepository::new(&mut self.tx)
            .list_permissions()
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_role_permissions(&mut self) -> StoreResult<Vec<RolePermission>> {
        let rows = PermissionRepository::new(&mut self.tx)
            .list_role_permissions()
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl SessionRepo for PgUnitOfWork {
    async fn get_session_events(&mut self) -> StoreResult<Vec<SessionEvent>> {
        let rows = SessionRepository::new(&mut self.tx)
            .list_events()
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_session(&mut self, session: NewSession) -> StoreResult<Session> {
        let entity = SessionRepository::new(&mut self.tx)
            .create(&session)
            .await
            .map_err(store_error)?;
        Ok(entity.into())
    }

    async fn get_session(&mut self, id: Uuid) -> StoreResult<Option<Session>> {
        let entity = SessionRepository::new(&mut self.tx)
            .find_by_id(id)
            .await
            .map_err(store_error)?;
        Ok(entity.map(Into::into))
    }

    async fn end_session(&mut self, id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        SessionRepository::new(&mut self.tx)
            .end(id, at)
            .await
            .map_err(store_error)
    }

    async fn add_session_log(&mut self, entry: NewSessionLog) -> StoreResult<()> {
        SessionRepository::new(&mut self.tx)
            .add_log(&entry)
            .await
            .map_err(store_error)
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(store_error)
    }
}
