//! Read-through application cache.
//!
//! [`CacheManager`] serves lookup data (configuration, permissions,
//! role permissions, session events) from a [`CacheProvider`]. On a miss it
//! opens a unit of work, runs the fetch for that key, commits, stores the
//! result and returns it. Entries stay until they are removed explicitly.
//!
//! Concurrent misses on the same key are not coalesced: each one loads from
//! the store and the last `set` wins.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use metrics::counter;
use thiserror::Error;
use tracing::{debug, info};

use domain::models::{ApplicationConfiguration, ConfigurationItem, Permission, RolePermission, SessionEvent};
use domain::services::{CacheKey, CacheProvider, CachedValue, StoreError, UnitOfWorkFactory};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to load {key} into the cache: {source}")]
    Load {
        key: CacheKey,
        #[source]
        source: StoreError,
    },

    #[error("Cache entry {key} holds a {found} value")]
    Mismatch { key: CacheKey, found: CacheKey },
}

/// Process-local cache provider.
#[derive(Debug, Default)]
pub struct InMemoryCacheProvider {
    entries: RwLock<HashMap<CacheKey, CachedValue>>,
}

impl InMemoryCacheProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheProvider for InMemoryCacheProvider {
    fn try_get(&self, key: CacheKey) -> Option<CachedValue> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    fn set(&self, key: CacheKey, value: CachedValue) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value);
    }

    fn remove(&self, key: CacheKey) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Read-through cache over the unit-of-work store.
#[derive(Clone)]
pub struct CacheManager {
    provider: Arc<dyn CacheProvider>,
    store: Arc<dyn UnitOfWorkFactory>,
}

impl CacheManager {
    pub fn new(provider: Arc<dyn CacheProvider>, store: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { provider, store }
    }

    /// Returns the cached value for `key`, loading it on a miss.
    ///
    /// Store failures are returned to the caller and nothing is cached.
    pub async fn get(&self, key: CacheKey) -> Result<CachedValue, CacheError> {
        if let Some(value) = self.provider.try_get(key) {
            counter!("cache_requests_total", "key" => key.as_str(), "result" => "hit").increment(1);
            return Ok(value);
        }
        counter!("cache_requests_total", "key" => key.as_str(), "result" => "miss").increment(1);

        let value = self
            .load(key)
            .await
            .map_err(|source| CacheError::Load { key, source })?;

        debug!(key = %key, entries = value.len(), "Cache entry loaded");
        self.provider.set(key, value.clone());
        Ok(value)
    }

    async fn load(&self, key: CacheKey) -> Result<CachedValue, StoreError> {
        let mut uow = self.store.begin().await?;
        let value = match key {
            CacheKey::Configuration => {
                CachedValue::Configuration(Arc::new(uow.get_configuration_items().await?))
            }
            CacheKey::Permissions => CachedValue::Permissions(Arc::new(uow.get_permissions().await?)),
            CacheKey::RolePermissions => {
                CachedValue::RolePermissions(Arc::new(uow.get_role_permissions().await?))
            }
            CacheKey::SessionEvents => {
                CachedValue::SessionEvents(Arc::new(uow.get_session_events().await?))
            }
        };
        uow.commit().await?;
        Ok(value)
    }

    /// Evicts `key`; the next `get` reloads it.
    pub fn remove(&self, key: CacheKey) {
        self.provider.remove(key);
        info!(key = %key, "Cache entry removed");
    }

    pub fn clear(&self) {
        self.provider.clear();
        info!("Cache cleared");
    }

    pub async fn configuration_items(&self) -> Result<Arc<Vec<ConfigurationItem>>, CacheError> {
        match self.get(CacheKey::Configuration).await? {
            CachedValue::Configuration(items) => Ok(items),
            other => Err(mismatch(CacheKey::Configuration, &other)),
        }
    }

    pub async fn configuration(&self) -> Result<ApplicationConfiguration, CacheError> {
        let items = self.configuration_items().await?;
        Ok(ApplicationConfiguration::from_items(&items))
    }

    pub async fn permissions(&self) -> Result<Arc<Vec<Permission>>, CacheError> {
        match self.get(CacheKey::Permissions).await? {
            CachedValue::Permissions(items) => Ok(items),
            other => Err(mismatch(CacheKey::Permissions, &other)),
        }
    }

    pub async fn role_permissions(&self) -> Result<Arc<Vec<RolePermission>>, CacheError> {
        match self.get(CacheKey::RolePermissions).await? {
            CachedValue::RolePermissions(items) => Ok(items),
            other => Err(mismatch(CacheKey::RolePermissions, &other)),
        }
    }

    pub async fn session_events(&self) -> Result<Arc<Vec<SessionEvent>>, CacheError> {
        match self.get(CacheKey::SessionEvents).await? {
            CachedValue::SessionEvents(items) => Ok(items),
            other => Err(mismatch(CacheKey::SessionEvents, &other)),
        }
    }
}

fn mismatch(key: CacheKey, found: &CachedValue) -> CacheError {
    CacheError::Mismatch {
        key,
        found: found.key(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::MemoryStore;

    const FETCHES: [(CacheKey, &str); 4] = [
        (CacheKey::Configuration, "get_configuration_items"),
        (CacheKey::Permissions, "get_permissions"),
        (CacheKey::RolePermissions, "get_role_permissions"),
        (CacheKey::SessionEvents, "get_session_events"),
    ];

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::seeded();
        store.set_permissions(vec![
            Permission {
                id: 1,
                key: "users:read".to_string(),
                description: "View users".to_string(),
                group_name: "Users".to_string(),
            },
            Permission {
                id: 2,
                key: "cache:manage".to_string(),
                description: "Clear cache".to_string(),
                group_name: "Administration".to_string(),
            },
        ]);
        store.set_role_permissions(vec![RolePermission {
            role_id: 1,
            permission_id: 2,
        }]);
        store
    }

    fn manager(store: &MemoryStore) -> CacheManager {
        CacheManager::new(
            Arc::new(InMemoryCacheProvider::new()),
            Arc::new(store.clone()),
        )
    }

    #[tokio::test]
    async fn test_get_after_remove_fetches_once() {
        let store = seeded_store();
        let cache = manager(&store);

        for (key, fetch) in FETCHES {
            cache.get(key).await.unwrap();
            cache.remove(key);

            let before = store.read_count(fetch);
            let value = cache.get(key).await.unwrap();
            assert_eq!(store.read_count(fetch), before + 1, "{key}");
            assert_eq!(value.key(), key);
        }
    }

    #[tokio::test]
    async fn test_consecutive_gets_share_value() {
        let store = seeded_store();
        let cache = manager(&store);

        for (key, fetch) in FETCHES {
            let first = cache.get(key).await.unwrap();
            let second = cache.get(key).await.unwrap();
            assert_eq!(store.read_count(fetch), 1, "{key}");
            assert_eq!(first.len(), second.len());
        }

        let first = cache.permissions().await.unwrap();
        let second = cache.permissions().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_loaded_value_matches_store() {
        let store = seeded_store();
        let cache = manager(&store);

        let permissions = cache.permissions().await.unwrap();
        let keys: Vec<_> = permissions.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["users:read", "cache:manage"]);

        let configuration = cache.configuration().await.unwrap();
        assert_eq!(
            configuration.system_from_email_address(),
            Some("noreply@example.com")
        );
    }

    #[tokio::test]
    async fn test_store_failure_propagates_and_is_not_cached() {
        let store = seeded_store();
        let cache = manager(&store);
        store.fail_operation("get_session_events");

        let result = cache.get(CacheKey::SessionEvents).await;
        assert!(matches!(
            result,
            Err(CacheError::Load {
                key: CacheKey::SessionEvents,
                ..
            })
        ));

        store.restore_operation("get_session_events");
        let events = cache.session_events().await.unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(store.read_count("get_session_events"), 1);
    }

    #[tokio::test]
    async fn test_clear_evicts_everything() {
        let store = seeded_store();
        let provider = Arc::new(InMemoryCacheProvider::new());
        let cache = CacheManager::new(provider.clone(), Arc::new(store.clone()));

        for (key, _) in FETCHES {
            cache.get(key).await.unwrap();
        }
        assert_eq!(provider.len(), 4);

        cache.clear();
        assert!(provider.is_empty());

        cache.get(CacheKey::Permissions).await.unwrap();
        assert_eq!(store.read_count("get_permissions"), 2);
    }

    #[tokio::test]
    async fn test_stale_entry_served_until_removed() {
        let store = seeded_store();
        let cache = manager(&store);

        assert_eq!(cache.role_permissions().await.unwrap().len(), 1);
        store.set_role_permissions(vec![]);
        assert_eq!(cache.role_permissions().await.unwrap().len(), 1);

        cache.remove(CacheKey::RolePermissions);
        assert!(cache.role_permissions().await.unwrap().is_empty());
    }

    #[test]
    fn test_mismatched_entry() {
        let provider = InMemoryCacheProvider::new();
        provider.set(
            CacheKey::Permissions,
            CachedValue::SessionEvents(Arc::new(vec![])),
        );
        let found = provider.try_get(CacheKey::Permissions).unwrap();
        assert!(matches!(
            mismatch(CacheKey::Permissions, &found),
            CacheError::Mismatch {
                found: CacheKey::SessionEvents,
                ..
            }
        ));
    }
}
