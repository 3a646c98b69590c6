//! Repository implementations.
//!
//! Repositories borrow a connection for the duration of a call so the same
//! transaction can be shared by every repository in a unit of work.

pub mod configuration;
pub mod permission;
pub mod session;
pub mod user;
pub mod user_token;

pub use configuration::ConfigurationRepository;
pub use permission::PermissionRepository;
pub use session::SessionRepository;
pub use user::UserRepository;
pub use user_token::UserTokenRepository;
