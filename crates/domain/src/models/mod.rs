//! Domain models for the application template.

pub mod configuration;
pub mod permission;
pub mod session;
pub mod user;

pub use configuration::{ApplicationConfiguration, ConfigurationItem};
pub use permission::{permissions_for_role, Permission, RolePermission};
pub use session::{NewSession, NewSessionLog, Session, SessionEvent};
pub use user::{NewUserToken, TokenType, User, UserToken, SYSTEM_USER_ID};
