//! In-memory unit-of-work backend.
//!
//! Writes are staged on the unit of work and applied to the shared store on
//! commit, so dropping a unit of work discards them. Reads see committed
//! data plus the unit's own staged writes.
//!
//! Used for `memory://` database URLs during local development and as the
//! store behind service and router tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use domain::models::{
    ConfigurationItem, NewSession, NewSessionLog, NewUserToken, Permission, RolePermission,
    Session, SessionEvent, User, UserToken,
};
use domain::services::{
    ConfigurationRepo, PermissionRepo, SessionRepo, StoreError, StoreResult, TokenRepo,
    UnitOfWork, UnitOfWorkFactory, UserRepo,
};

/// A committed session log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLogRecord {
    pub session_id: Uuid,
    pub event_id: i32,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryData {
    users: Vec<User>,
    tokens: Vec<UserToken>,
    configuration: Vec<ConfigurationItem>,
    permissions: Vec<Permission>,
    role_permissions: Vec<RolePermission>,
    session_events: Vec<SessionEvent>,
    sessions: HashMap<Uuid, Session>,
    session_logs: Vec<SessionLogRecord>,
    last_token_id: i64,
}

#[derive(Debug, Default)]
struct MemoryInner {
    data: Mutex<MemoryData>,
    reads: Mutex<HashMap<&'static str, usize>>,
    failing: Mutex<HashSet<&'static str>>,
    commits: Mutex<usize>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared in-memory store. Cloning yields another handle to the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the same reference data the SQL migrations seed.
    pub fn seeded() -> Self {
        let store = Self::new();
        store.set_configuration(vec![
            ConfigurationItem::new("SYSTEM_FROM_EMAIL_ADDRESS", "noreply@example.com"),
            ConfigurationItem::new("CONTACT_EMAIL_ADDRESS", "contact@example.com"),
            ConfigurationItem::new("SESSION_TIMEOUT_MINUTES", "60"),
        ]);
        store.set_session_events(vec![
            SessionEvent {
                id: 1,
                key: "LOGIN_SUCCESS".to_string(),
                description: "User logged in".to_string(),
            },
            SessionEvent {
                id: 2,
                key: "LOGIN_FAILED".to_string(),
                description: "Login attempt rejected".to_string(),
            },
            SessionEvent {
                id: 3,
                key: "LOGOUT".to_string(),
                description: "User logged out".to_string(),
            },
        ]);
        store
    }

    pub fn insert_user(&self, user: User) {
        lock(&self.inner.data).users.push(user);
    }

    /// Inserts an already issued token, bypassing uniqueness checks.
    pub fn insert_token(&self, token: UserToken) {
        let mut data = lock(&self.inner.data);
        data.last_token_id = data.last_token_id.max(token.id);
        data.tokens.push(token);
    }

    pub fn set_configuration(&self, items: Vec<ConfigurationItem>) {
        lock(&self.inner.data).configuration = items;
    }

    pub fn set_permissions(&self, permissions: Vec<Permission>) {
        lock(&self.inner.data).permissions = permissions;
    }

    pub fn set_role_permissions(&self, role_permissions: Vec<RolePermission>) {
        lock(&self.inner.data).role_permissions = role_permissions;
    }

    pub fn set_session_events(&self, events: Vec<SessionEvent>) {
        lock(&self.inner.data).session_events = events;
    }

    pub fn users(&self) -> Vec<User> {
        lock(&self.inner.data).users.clone()
    }

    pub fn tokens(&self) -> Vec<UserToken> {
        lock(&self.inner.data).tokens.clone()
    }

    pub fn session(&self, id: Uuid) -> Option<Session> {
        lock(&self.inner.data).sessions.get(&id).cloned()
    }

    pub fn session_logs(&self) -> Vec<SessionLogRecord> {
        lock(&self.inner.data).session_logs.clone()
    }

    /// Number of times a read operation (e.g. `get_permissions`) ran.
    pub fn read_count(&self, operation: &str) -> usize {
        lock(&self.inner.reads)
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    pub fn commit_count(&self) -> usize {
        *lock(&self.inner.commits)
    }

    /// Makes every later call of `operation` fail with a backend error.
    pub fn fail_operation(&self, operation: &'static str) {
        lock(&self.inner.failing).insert(operation);
    }

    pub fn restore_operation(&self, operation: &str) {
        lock(&self.inner.failing).remove(operation);
    }

    fn check(&self, operation: &'static str) -> StoreResult<()> {
        if lock(&self.inner.failing).contains(operation) {
            return Err(StoreError::Backend(format!("{} unavailable", operation)));
        }
        Ok(())
    }

    fn read(&self, operation: &'static str) -> StoreResult<MutexGuard<'_, MemoryData>> {
        self.check(operation)?;
        *lock(&self.inner.reads).entry(operation).or_insert(0) += 1;
        Ok(lock(&self.inner.data))
    }
}

#[async_trait]
impl UnitOfWorkFactory for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        self.check("begin")?;
        Ok(Box::new(MemoryUnitOfWork {
            store: self.clone(),
            staged: Vec::new(),
        }))
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check("ping")
    }
}

#[derive(Debug)]
enum StagedWrite {
    LastLogin(Uuid, DateTime<Utc>),
    Token(UserToken),
    Session(Session),
    EndSession(Uuid, DateTime<Utc>),
    SessionLog(SessionLogRecord),
}

/// Unit of work over a [`MemoryStore`].
pub struct MemoryUnitOfWork {
    store: MemoryStore,
    staged: Vec<StagedWrite>,
}

impl MemoryUnitOfWork {
    fn staged_token(&self, token: Uuid) -> Option<&UserToken> {
        self.staged.iter().find_map(|write| match write {
            StagedWrite::Token(t) if t.token == token => Some(t),
            _ => None,
        })
    }

    fn visible_session(&self, data: &MemoryData, id: Uuid) -> Option<Session> {
        let mut session = data.sessions.get(&id).cloned();
        for write in &self.staged {
            match write {
                StagedWrite::Session(s) if s.id == id => session = Some(s.clone()),
                StagedWrite::EndSession(sid, at) if *sid == id => {
                    if let Some(s) = session.as_mut() {
                        s.ended_at = Some(*at);
                    }
                }
                _ => {}
            }
        }
        session
    }
}

#[async_trait]
impl UserRepo for MemoryUnitOfWork {
    async fn get_user_by_id(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        let data = self.store.read("get_user_by_id")?;
        Ok(data.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&mut self, email_address: &str) -> StoreResult<Option<User>> {
        let wanted = email_address.trim();
        let data = self.store.read("get_user_by_email")?;
        Ok(data
            .users
            .iter()
            .find(|u| u.email_address.eq_ignore_ascii_case(wanted))
            .cloned())
    }

    async fn update_last_login(&mut self, user_id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        self.store.check("update_last_login")?;
        self.staged.push(StagedWrite::LastLogin(user_id, at));
        Ok(())
    }
}

#[async_trait]
impl TokenRepo for MemoryUnitOfWork {
    async fn get_user_token_by_guid(&mut self, token: Uuid) -> StoreResult<Option<UserToken>> {
        let committed = {
            let data = self.store.read("get_user_token_by_guid")?;
            data.tokens.iter().find(|t| t.token == token).cloned()
        };
        Ok(committed.or_else(|| self.staged_token(token).cloned()))
    }

    async fn create_user_token(&mut self, token: NewUserToken) -> StoreResult<UserToken> {
        self.store.check("create_user_token")?;
        let mut data = lock(&self.store.inner.data);
        if data.tokens.iter().any(|t| t.token == token.token) || self.staged_token(token.token).is_some()
        {
            return Err(StoreError::Conflict(format!(
                "user token {} already exists",
                token.token
            )));
        }

        data.last_token_id += 1;
        let created = UserToken {
            id: data.last_token_id,
            user_id: token.user_id,
            token: token.token,
            token_type: token.token_type,
            created_by: token.created_by,
            created_at: Utc::now(),
        };
        drop(data);

        self.staged.push(StagedWrite::Token(created.clone()));
        Ok(created)
    }
}

#[async_trait]
impl ConfigurationRepo for MemoryUnitOfWork {
    async fn get_configuration_items(&mut self) -> StoreResult<Vec<ConfigurationItem>> {
        let data = self.store.read("get_configuration_items")?;
        Ok(data.configuration.clone())
    }
}

#[async_trait]
impl PermissionRepo for MemoryUnitOfWork {
    async fn get_permissions(&mut self) -> StoreResult<Vec<Permission>> {
        let data = self.store.read("get_permissions")?;
        Ok(data.permissions.clone())
    }

    async fn get_role_permissions(&mut self) -> StoreResult<Vec<RolePermission>> {
        let data = self.store.read("get_role_permissions")?;
        Ok(data.role_permissions.clone())
    }
}

#[async_trait]
impl SessionRepo for MemoryUnitOfWork {
    async fn get_session_events(&mut self) -> StoreResult<Vec<SessionEvent>> {
        let data = self.store.read("get_session_events")?;
        Ok(data.session_events.clone())
    }

    async fn create_session(&mut self, session: NewSession) -> StoreResult<Session> {
        self.store.check("create_session")?;
        let created = Session {
            id: session.id,
            user_id: session.user_id,
            created_at: Utc::now(),
            expires_at: session.expires_at,
            ended_at: None,
        };
        self.staged.push(StagedWrite::Session(created.clone()));
        Ok(created)
    }

    async fn get_session(&mut self, id: Uuid) -> StoreResult<Option<Session>> {
        let data = self.store.read("get_session")?;
        Ok(self.visible_session(&data, id))
    }

    async fn end_session(&mut self, id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        let open = {
            let data = self.store.read("end_session")?;
            self.visible_session(&data, id)
                .map(|s| s.ended_at.is_none())
                .unwrap_or(false)
        };
        if open {
            self.staged.push(StagedWrite::EndSession(id, at));
        }
        Ok(open)
    }

    async fn add_session_log(&mut self, entry: NewSessionLog) -> StoreResult<()> {
        self.store.check("add_session_log")?;
        self.staged.push(StagedWrite::SessionLog(SessionLogRecord {
            session_id: entry.session_id,
            event_id: entry.event_id,
            message: entry.message,
            created_at: Utc::now(),
        }));
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.store.check("commit")?;
        let MemoryUnitOfWork { store, staged } = *self;
        let mut data = lock(&store.inner.data);

        for write in &staged {
            if let StagedWrite::Token(token) = write {
                if data.tokens.iter().any(|t| t.token == token.token) {
                    return Err(StoreError::Conflict(format!(
                        "user token {} already exists",
                        token.token
                    )));
                }
            }
        }

        for write in staged {
            match write {
                StagedWrite::LastLogin(user_id, at) => {
                    if let Some(user) = data.users.iter_mut().find(|u| u.id == user_id) {
                        user.last_login_at = Some(at);
                        user.updated_at = at;
                    }
                }
                StagedWrite::Token(token) => data.tokens.push(token),
                StagedWrite::Session(session) => {
                    data.sessions.insert(session.id, session);
                }
                StagedWrite::EndSession(id, at) => {
                    if let Some(session) = data.sessions.get_mut(&id) {
                        session.ended_at.get_or_insert(at);
                    }
                }
                StagedWrite::SessionLog(entry) => data.session_logs.push(entry),
            }
        }
        drop(data);

        *lock(&store.inner.commits) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::TokenType;

    fn user(email: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email_address: email.to_string(),
            display_name: "Test".to_string(),
            password_hash: None,
            is_active: true,
            email_verified: false,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    fn new_token(user_id: Uuid) -> NewUserToken {
        NewUserToken {
            user_id,
            token: Uuid::new_v4(),
            token_type: TokenType::AccountActivation,
            created_by: Uuid::nil(),
        }
    }

    #[tokio::test]
    async fn test_staged_token_visible_in_same_unit() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let created = uow.create_user_token(new_token(Uuid::new_v4())).await.unwrap();

        let found = uow.get_user_token_by_guid(created.token).await.unwrap();
        assert_eq!(found, Some(created));
        assert!(store.tokens().is_empty());
    }

    #[tokio::test]
    async fn test_commit_applies_writes() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        uow.create_user_token(new_token(Uuid::new_v4())).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(store.tokens().len(), 1);
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let store = MemoryStore::new();
        {
            let mut uow = store.begin().await.unwrap();
            uow.create_user_token(new_token(Uuid::new_v4())).await.unwrap();
        }
        assert!(store.tokens().is_empty());
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_token_conflicts() {
        let store = MemoryStore::new();
        let token = new_token(Uuid::new_v4());

        let mut first = store.begin().await.unwrap();
        first.create_user_token(token.clone()).await.unwrap();
        first.commit().await.unwrap();

        let mut second = store.begin().await.unwrap();
        let result = second.create_user_token(token).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_email_lookup_ignores_case() {
        let store = MemoryStore::new();
        store.insert_user(user("Someone@Example.com"));

        let mut uow = store.begin().await.unwrap();
        let found = uow.get_user_by_email(" someone@example.COM ").await.unwrap();
        assert!(found.is_some());
        assert_eq!(store.read_count("get_user_by_email"), 1);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();

        let mut uow = store.begin().await.unwrap();
        uow.create_session(NewSession {
            id,
            user_id: None,
            expires_at: Utc::now() + chrono::Duration::minutes(5),
        })
        .await
        .unwrap();
        assert!(uow.end_session(id, Utc::now()).await.unwrap());
        assert!(!uow.end_session(id, Utc::now()).await.unwrap());
        uow.commit().await.unwrap();

        assert!(store.session(id).unwrap().ended_at.is_some());
    }

    #[tokio::test]
    async fn test_failing_operation() {
        let store = MemoryStore::new();
        store.fail_operation("get_permissions");

        let mut uow = store.begin().await.unwrap();
        assert!(matches!(
            uow.get_permissions().await,
            Err(StoreError::Backend(_))
        ));

        store.restore_operation("get_permissions");
        assert!(uow.get_permissions().await.unwrap().is_empty());
    }
}
