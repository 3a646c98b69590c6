//! Application services.

pub mod account;
pub mod cache;
pub mod email;
pub mod email_provider;
pub mod templates;
pub mod tokens;

pub use account::{AccountError, AccountService, LoginResult};
pub use cache::{CacheError, CacheManager, InMemoryCacheProvider};
pub use email::{ContactMessage, EmailFlowError, EmailService};
pub use email_provider::ConfiguredEmailProvider;
pub use templates::{EmailTemplate, EmailTemplateKind, EmailTemplateRepository, TemplateRenderer};
pub use tokens::{RandomTokenGenerator, TokenGenerator, TokenIssueError, UniqueTokenIssuer};
