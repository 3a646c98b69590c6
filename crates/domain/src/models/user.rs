//! User and user token domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Creator id recorded on rows written by the system rather than a person.
pub const SYSTEM_USER_ID: Uuid = Uuid::nil();

/// An account holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email_address: String,
    pub display_name: String,
    /// Argon2id PHC hash; `None` for accounts that never set a password.
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Purpose a user token was issued for.
///
/// The numeric ids are persisted and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    AccountActivation,
    ResetPassword,
    ForgotPassword,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenTypeError {
    #[error("Unknown token type id: {0}")]
    UnknownId(i16),

    #[error("Unknown token type: {0}")]
    UnknownName(String),
}

impl TokenType {
    pub fn id(self) -> i16 {
        match self {
            TokenType::AccountActivation => 1,
            TokenType::ResetPassword => 2,
            TokenType::ForgotPassword => 3,
        }
    }

    pub fn from_id(id: i16) -> Result<Self, TokenTypeError> {
        match id {
            1 => Ok(TokenType::AccountActivation),
            2 => Ok(TokenType::ResetPassword),
            3 => Ok(TokenType::ForgotPassword),
            other => Err(TokenTypeError::UnknownId(other)),
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::AccountActivation => write!(f, "account_activation"),
            TokenType::ResetPassword => write!(f, "reset_password"),
            TokenType::ForgotPassword => write!(f, "forgot_password"),
        }
    }
}

impl FromStr for TokenType {
    type Err = TokenTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "account_activation" => Ok(TokenType::AccountActivation),
            "reset_password" => Ok(TokenType::ResetPassword),
            "forgot_password" => Ok(TokenType::ForgotPassword),
            other => Err(TokenTypeError::UnknownName(other.to_string())),
        }
    }
}

/// A persisted single-use token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserToken {
    pub id: i64,
    pub user_id: Uuid,
    pub token: Uuid,
    pub token_type: TokenType,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Insert shape for a user token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserToken {
    pub user_id: Uuid,
    pub token: Uuid,
    pub token_type: TokenType,
    pub created_by: Uuid,
}
