//! Collaborator interfaces used by the service layer.
//!
//! Implementations live in the persistence crate (unit of work) and the API
//! crate (cache provider, email transports).

pub mod cache;
pub mod email;
pub mod store;

pub use cache::{CacheKey, CacheProvider, CachedValue, UnknownCacheKey};
pub use email::{EmailError, EmailMessage, EmailProvider, RecordingEmailProvider};
pub use store::{
    ConfigurationRepo, PermissionRepo, SessionRepo, StoreError, StoreResult, TokenRepo,
    UnitOfWork, UnitOfWorkFactory, UserRepo,
};
