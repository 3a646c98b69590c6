//! Token emails sent on behalf of a user.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::RequestBaseUrl;
use crate::routes::account::AcceptedResponse;

/// POST /api/v1/users/:user_id/activation-email
pub async fn send_activation_email(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    base_url: RequestBaseUrl,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    state
        .email
        .send_account_activation(user_id, base_url.as_str())
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse::new("Activation email sent")),
    ))
}

/// POST /api/v1/users/:user_id/password-reset-email
pub async fn send_password_reset_email(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    base_url: RequestBaseUrl,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    state
        .email
        .send_reset_password(user_id, base_url.as_str())
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse::new("Password reset email sent")),
    ))
}
