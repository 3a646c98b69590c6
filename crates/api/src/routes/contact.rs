//! Contact form.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::RequestBaseUrl;
use crate::routes::account::AcceptedResponse;
use crate::services::ContactMessage;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email_address: String,

    #[validate(length(min = 1, max = 4000, message = "Message must be 1-4000 characters"))]
    pub message: String,
}

/// POST /api/v1/contact
pub async fn send_contact_message(
    State(state): State<AppState>,
    base_url: RequestBaseUrl,
    Json(request): Json<ContactRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    request.validate()?;

    let contact = ContactMessage {
        name: request.name.trim().to_string(),
        email_address: request.email_address.trim().to_string(),
        message: request.message,
    };
    state
        .email
        .send_contact_message(contact, base_url.as_str())
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse::new("Message sent")),
    ))
}
