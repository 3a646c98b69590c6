//! Account routes: login, logout and forgot password.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::RequestBaseUrl;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email_address: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub email_address: String,
    pub display_name: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub session_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    pub ended: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email_address: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcceptedResponse {
    pub message: String,
}

impl AcceptedResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// POST /api/v1/account/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    request.validate()?;

    let result = state
        .accounts
        .login(request.email_address.trim(), &request.password)
        .await?;

    Ok(Json(LoginResponse {
        session_id: result.session_id,
        user_id: result.user_id,
        email_address: result.email_address,
        display_name: result.display_name,
        expires_at: result.expires_at,
    }))
}

/// POST /api/v1/account/logout
///
/// Unknown or already ended sessions are not an error; `ended` is false.
pub async fn logout(
    State(state): State<AppState>,
    Json(request): Json<LogoutRequest>,
) -> Result<Json<LogoutResponse>, ApiError> {
    let ended = state.accounts.logout(request.session_id).await?;
    Ok(Json(LogoutResponse { ended }))
}

/// POST /api/v1/account/forgot-password
///
/// Always 202 once the request is valid, whether or not the address belongs
/// to an account. Failures are logged, never reported, so the status cannot
/// reveal which addresses are registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    base_url: RequestBaseUrl,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    request.validate()?;

    if let Err(err) = state
        .email
        .send_forgot_password(&request.email_address, base_url.as_str())
        .await
    {
        tracing::error!(error = %err, "Forgot password email failed");
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse::new(
            "If the address belongs to an account, a reset link has been sent",
        )),
    ))
}
