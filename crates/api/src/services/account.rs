//! Login and logout.
//!
//! Every login attempt opens a session row so it can carry a session log.
//! Failed attempts get a session that is ended immediately.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use domain::models::session::{find_event, LOGIN_FAILED, LOGIN_SUCCESS, LOGOUT};
use domain::models::{NewSession, NewSessionLog, SessionEvent, User};
use domain::services::{StoreError, UnitOfWork, UnitOfWorkFactory};
use shared::password::{verify_password, PasswordError};

use crate::services::cache::{CacheError, CacheManager};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User is disabled")]
    UserDisabled,

    #[error("Session event {0} is not defined")]
    MissingSessionEvent(&'static str),

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Outcome of a successful login.
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub email_address: String,
    pub display_name: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn UnitOfWorkFactory>,
    cache: CacheManager,
}

impl AccountService {
    pub fn new(store: Arc<dyn UnitOfWorkFactory>, cache: CacheManager) -> Self {
        Self { store, cache }
    }

    pub async fn login(&self, email_address: &str, password: &str) -> Result<LoginResult, AccountError> {
        let events = self.cache.session_events().await?;
        let configuration = self.cache.configuration().await?;

        let mut uow = self.store.begin().await?;
        let user = uow.get_user_by_email(email_address).await?;

        let user = match user {
            Some(user) => user,
            None => {
                let reason = "unknown email address";
                self.record_failed_login(uow, &events, None, reason).await?;
                return Err(AccountError::InvalidCredentials);
            }
        };

        // Only a caller holding the password learns that the account is disabled.
        if !password_matches(&user, password)? {
            self.record_failed_login(uow, &events, Some(user.id), "wrong password")
                .await?;
            return Err(AccountError::InvalidCredentials);
        }

        if !user.is_active {
            self.record_failed_login(uow, &events, Some(user.id), "user disabled")
                .await?;
            return Err(AccountError::UserDisabled);
        }

        let event_id = event_id(&events, LOGIN_SUCCESS)?;
        let now = Utc::now();
        let session = uow
            .create_session(NewSession {
                id: Uuid::new_v4(),
                user_id: Some(user.id),
                expires_at: session_expiry(now, configuration.session_timeout_minutes()),
            })
            .await?;
        uow.add_session_log(NewSessionLog {
            session_id: session.id,
            event_id,
            message: None,
        })
        .await?;
        uow.update_last_login(user.id, now).await?;
        uow.commit().await?;

        info!(user_id = %user.id, session_id = %session.id, "User logged in");

        Ok(LoginResult {
            session_id: session.id,
            user_id: user.id,
            email_address: user.email_address,
            display_name: user.display_name,
            expires_at: session.expires_at,
        })
    }

    /// Ends the session. Returns false, without writing anything, when the
    /// session is unknown or already ended.
    pub async fn logout(&self, session_id: Uuid) -> Result<bool, AccountError> {
        let events = self.cache.session_events().await?;
        let event_id = event_id(&events, LOGOUT)?;

        let mut uow = self.store.begin().await?;
        if !uow.end_session(session_id, Utc::now()).await? {
            info!(session_id = %session_id, "Logout for unknown or ended session");
            return Ok(false);
        }

        uow.add_session_log(NewSessionLog {
            session_id,
            event_id,
            message: None,
        })
        .await?;
        uow.commit().await?;

        info!(session_id = %session_id, "User logged out");
        Ok(true)
    }

    async fn record_failed_login(
        &self,
        mut uow: Box<dyn UnitOfWork>,
        events: &[SessionEvent],
        user_id: Option<Uuid>,
        reason: &str,
    ) -> Result<(), AccountError> {
        let event_id = event_id(events, LOGIN_FAILED)?;
        let now = Utc::now();

        let session = uow
            .create_session(NewSession {
                id: Uuid::new_v4(),
                user_id,
                expires_at: now,
            })
            .await?;
        uow.end_session(session.id, now).await?;
        uow.add_session_log(NewSessionLog {
            session_id: session.id,
            event_id,
            message: Some(reason.to_string()),
        })
        .await?;
        uow.commit().await?;

        warn!(user_id = ?user_id, reason, "Login failed");
        Ok(())
    }
}

fn password_matches(user: &User, password: &str) -> Result<bool, PasswordError> {
    match &user.password_hash {
        Some(hash) => verify_password(password, hash),
        None => Ok(false),
    }
}

/// `now + minutes`, saturating at the latest representable instant.
fn session_expiry(now: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    Duration::try_minutes(minutes)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn event_id(events: &[SessionEvent], key: &'static str) -> Result<i32, AccountError> {
    find_event(events, key)
        .map(|event| event.id)
        .ok_or(AccountError::MissingSessionEvent(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::configuration::SESSION_TIMEOUT_MINUTES;
    use domain::models::ConfigurationItem;
    use persistence::MemoryStore;
    use shared::password::hash_password;

    use crate::services::cache::InMemoryCacheProvider;

    const PASSWORD: &str = "correct horse battery staple";

    fn setup() -> (MemoryStore, AccountService, User) {
        let store = MemoryStore::seeded();
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email_address: "user@example.com".to_string(),
            display_name: "User".to_string(),
            password_hash: Some(hash_password(PASSWORD).unwrap()),
            is_active: true,
            email_verified: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        store.insert_user(user.clone());

        let factory: Arc<dyn UnitOfWorkFactory> = Arc::new(store.clone());
        let cache = CacheManager::new(Arc::new(InMemoryCacheProvider::new()), factory.clone());
        (store, AccountService::new(factory, cache), user)
    }

    #[tokio::test]
    async fn test_login_creates_session_and_log() {
        let (store, service, user) = setup();

        let result = service.login("USER@example.com", PASSWORD).await.unwrap();

        assert_eq!(result.user_id, user.id);
        let session = store.session(result.session_id).unwrap();
        assert!(session.is_active(Utc::now()));
        assert_eq!(session.user_id, Some(user.id));

        let logs = store.session_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].event_id, 1);
        assert!(store.users()[0].last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_session_lifetime_from_configuration() {
        let (store, service, _) = setup();
        store.set_configuration(vec![ConfigurationItem::new(SESSION_TIMEOUT_MINUTES, "5")]);

        let before = Utc::now();
        let result = service.login("user@example.com", PASSWORD).await.unwrap();

        assert!(result.expires_at <= Utc::now() + Duration::minutes(5));
        assert!(result.expires_at >= before + Duration::minutes(5));
    }

    #[tokio::test]
    async fn test_wrong_password_is_logged() {
        let (store, service, user) = setup();

        let result = service.login("user@example.com", "nope").await;

        assert!(matches!(result, Err(AccountError::InvalidCredentials)));
        let logs = store.session_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].event_id, 2);
        assert_eq!(logs[0].message.as_deref(), Some("wrong password"));
        let session = store.session(logs[0].session_id).unwrap();
        assert_eq!(session.user_id, Some(user.id));
        assert!(session.ended_at.is_some());
        assert!(store.users()[0].last_login_at.is_none());
    }

    #[tokio::test]
    async fn test_unknown_email_is_invalid_credentials() {
        let (store, service, _) = setup();

        let result = service.login("ghost@example.com", PASSWORD).await;

        assert!(matches!(result, Err(AccountError::InvalidCredentials)));
        let logs = store.session_logs();
        assert_eq!(store.session(logs[0].session_id).unwrap().user_id, None);
    }

    #[tokio::test]
    async fn test_disabled_user() {
        let (store, service, mut user) = setup();
        user.id = Uuid::new_v4();
        user.email_address = "disabled@example.com".to_string();
        user.is_active = false;
        store.insert_user(user);

        let result = service.login("disabled@example.com", PASSWORD).await;
        assert!(matches!(result, Err(AccountError::UserDisabled)));
    }

    #[tokio::test]
    async fn test_disabled_user_with_wrong_password_is_invalid_credentials() {
        let (store, service, mut user) = setup();
        user.id = Uuid::new_v4();
        user.email_address = "disabled@example.com".to_string();
        user.is_active = false;
        store.insert_user(user);

        let result = service.login("disabled@example.com", "nope").await;

        assert!(matches!(result, Err(AccountError::InvalidCredentials)));
        let logs = store.session_logs();
        assert_eq!(logs[0].message.as_deref(), Some("wrong password"));
    }

    #[tokio::test]
    async fn test_oversized_session_timeout_falls_back_to_default() {
        let (store, service, _) = setup();
        store.set_configuration(vec![ConfigurationItem::new(
            SESSION_TIMEOUT_MINUTES,
            "9223372036854775807",
        )]);

        let before = Utc::now();
        let result = service.login("user@example.com", PASSWORD).await.unwrap();

        assert!(result.expires_at >= before + Duration::minutes(60));
        assert!(result.expires_at <= Utc::now() + Duration::minutes(60));
    }

    #[test]
    fn test_session_expiry_saturates() {
        let now = Utc::now();
        assert_eq!(session_expiry(now, 5), now + Duration::minutes(5));
        assert_eq!(session_expiry(now, i64::MAX), DateTime::<Utc>::MAX_UTC);
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let (store, service, _) = setup();
        let login = service.login("user@example.com", PASSWORD).await.unwrap();

        assert!(service.logout(login.session_id).await.unwrap());

        let session = store.session(login.session_id).unwrap();
        assert!(session.ended_at.is_some());
        let logs = store.session_logs();
        assert_eq!(logs.last().map(|l| l.event_id), Some(3));

        assert!(!service.logout(login.session_id).await.unwrap());
        assert_eq!(store.session_logs().len(), 2);
    }

    #[tokio::test]
    async fn test_logout_unknown_session_is_noop() {
        let (store, service, _) = setup();

        assert!(!service.logout(Uuid::new_v4()).await.unwrap());
        assert!(store.session_logs().is_empty());
    }

    #[tokio::test]
    async fn test_missing_session_event() {
        let (store, service, _) = setup();
        store.set_session_events(vec![]);

        let result = service.logout(Uuid::new_v4()).await;
        assert!(matches!(
            result,
            Err(AccountError::MissingSessionEvent(LOGOUT))
        ));
    }
}
