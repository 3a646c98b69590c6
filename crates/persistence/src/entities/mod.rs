//! Database entity definitions (row mappings).

pub mod configuration;
pub mod permission;
pub mod session;
pub mod user;

pub use configuration::ConfigurationItemEntity;
pub use permission::{PermissionEntity, RolePermissionEntity};
pub use session::{SessionEntity, SessionEventEntity};
pub use user::{UserEntity, UserTokenEntity};
