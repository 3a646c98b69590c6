//! Application cache interface.
//!
//! The cache holds a fixed set of lookup resources. Entries never expire on
//! their own; callers evict them explicitly.

use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::models::{ConfigurationItem, Permission, RolePermission, SessionEvent};

/// Resources held by the application cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheKey {
    Configuration,
    Permissions,
    RolePermissions,
    SessionEvents,
}

impl CacheKey {
    pub const ALL: [CacheKey; 4] = [
        CacheKey::Configuration,
        CacheKey::Permissions,
        CacheKey::RolePermissions,
        CacheKey::SessionEvents,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CacheKey::Configuration => "configuration",
            CacheKey::Permissions => "permissions",
            CacheKey::RolePermissions => "role-permissions",
            CacheKey::SessionEvents => "session-events",
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown cache key: {0}")]
pub struct UnknownCacheKey(pub String);

impl FromStr for CacheKey {
    type Err = UnknownCacheKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CacheKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownCacheKey(s.to_string()))
    }
}

/// A cached sequence of records. Values are shared, never copied, so readers
/// must treat them as immutable.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Configuration(Arc<Vec<ConfigurationItem>>),
    Permissions(Arc<Vec<Permission>>),
    RolePermissions(Arc<Vec<RolePermission>>),
    SessionEvents(Arc<Vec<SessionEvent>>),
}

impl CachedValue {
    /// The key this value belongs under.
    pub fn key(&self) -> CacheKey {
        match self {
            CachedValue::Configuration(_) => CacheKey::Configuration,
            CachedValue::Permissions(_) => CacheKey::Permissions,
            CachedValue::RolePermissions(_) => CacheKey::RolePermissions,
            CachedValue::SessionEvents(_) => CacheKey::SessionEvents,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CachedValue::Configuration(items) => items.len(),
            CachedValue::Permissions(items) => items.len(),
            CachedValue::RolePermissions(items) => items.len(),
            CachedValue::SessionEvents(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process keyed store. No TTL and no size bound.
pub trait CacheProvider: Send + Sync {
    fn try_get(&self, key: CacheKey) -> Option<CachedValue>;

    fn set(&self, key: CacheKey, value: CachedValue);

    fn remove(&self, key: CacheKey);

    fn clear(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_parse_roundtrip() {
        for key in CacheKey::ALL {
            assert_eq!(key.as_str().parse::<CacheKey>(), Ok(key));
        }
        assert_eq!(
            "users".parse::<CacheKey>(),
            Err(UnknownCacheKey("users".to_string()))
        );
    }

    #[test]
    fn test_cached_value_key() {
        let value = CachedValue::SessionEvents(Arc::new(vec![]));
        assert_eq!(value.key(), CacheKey::SessionEvents);
        assert!(value.is_empty());
    }
}
