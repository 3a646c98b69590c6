use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use domain::services::{CacheKey, StoreError, UnknownCacheKey};

use crate::services::{AccountError, CacheError, EmailFlowError, TokenIssueError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Too many requests. Please try again later.".into(),
            ),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg.clone(),
            ),
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".into()),
            sqlx::Error::PoolTimedOut => {
                ApiError::ServiceUnavailable("Database is unavailable".into())
            }
            _ => ApiError::Internal(format!("Database error: {}", err)),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(db_err) => db_err.into(),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Backend(msg) => ApiError::Internal(format!("Store error: {}", msg)),
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Load { source, .. } => source.into(),
            CacheError::Mismatch { .. } => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<TokenIssueError> for ApiError {
    fn from(err: TokenIssueError) -> Self {
        match err {
            TokenIssueError::Store(store) => store.into(),
            TokenIssueError::AttemptsExhausted { .. } => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<EmailFlowError> for ApiError {
    fn from(err: EmailFlowError) -> Self {
        match err {
            EmailFlowError::UserNotFound(_) => ApiError::NotFound("User not found".into()),
            EmailFlowError::Store(store) => store.into(),
            EmailFlowError::Token(token) => token.into(),
            EmailFlowError::Cache(cache) => cache.into(),
            EmailFlowError::Email(email) => {
                tracing::error!(error = %email, "Email delivery failed");
                ApiError::ServiceUnavailable("Email could not be sent".into())
            }
            EmailFlowError::MissingConfiguration(_) | EmailFlowError::Template(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid email or password".into())
            }
            AccountError::UserDisabled => ApiError::Forbidden("Account is disabled".into()),
            AccountError::Store(store) => store.into(),
            AccountError::Cache(cache) => cache.into(),
            AccountError::MissingSessionEvent(_) | AccountError::Password(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<UnknownCacheKey> for ApiError {
    fn from(err: UnknownCacheKey) -> Self {
        let known: Vec<&str> = CacheKey::ALL.iter().map(|k| k.as_str()).collect();
        ApiError::NotFound(format!("{}. Known keys: {}", err, known.join(", ")))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();

        let message = if messages.len() == 1 {
            messages[0].clone()
        } else {
            format!("{} validation errors", messages.len())
        };

        ApiError::Validation(message)
    }
}
