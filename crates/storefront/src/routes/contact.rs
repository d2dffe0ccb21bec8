//! Contact form route handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cakeshop_core::{ContactMessageId, ContactStatus, Email};

use crate::db::ContactRepository;
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAdmin;
use crate::models::{ContactMessage, NewContactMessage};
use crate::state::AppState;

/// Longest accepted message body, in characters.
const MAX_MESSAGE_LENGTH: usize = 5000;

/// Contact form body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub message: &'static str,
    pub id: ContactMessageId,
}

impl ContactRequest {
    fn validate(self) -> Result<NewContactMessage, AppError> {
        let name = self.name.trim();
        let message = self.message.trim();
        if name.is_empty() || message.is_empty() {
            return Err(AppError::BadRequest(
                "name, email and message are required".to_string(),
            ));
        }
        if message.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(AppError::BadRequest(format!(
                "message must be at most {MAX_MESSAGE_LENGTH} characters"
            )));
        }
        let email = Email::parse(&self.email)
            .map_err(|_| AppError::BadRequest("Invalid email address".to_string()))?;
        let phone = self
            .phone
            .map(|p| p.trim().to_owned())
            .filter(|p| !p.is_empty());

        Ok(NewContactMessage {
            name: name.to_owned(),
            email: email.into_inner(),
            phone,
            message: message.to_owned(),
        })
    }
}

/// Store a contact form submission.
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn submit(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ContactRequest>,
) -> Result<impl IntoResponse, AppError> {
    let message = body.validate()?;
    let stored = ContactRepository::new(state.pool()).create(&message).await?;
    tracing::info!(message_id = %stored.id, "Contact message received");

    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            message: "Message sent successfully",
            id: stored.id,
        }),
    ))
}

/// All messages, newest first.
pub async fn admin_list(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<ContactMessage>>, AppError> {
    Ok(Json(ContactRepository::new(state.pool()).list().await?))
}

/// Mark a message as read.
pub async fn mark_read(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiPath(id): ApiPath<ContactMessageId>,
) -> Result<Json<ContactMessage>, AppError> {
    ContactRepository::new(state.pool())
        .set_status(id, ContactStatus::Read)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Message not found".to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(email: &str, message: &str, phone: Option<&str>) -> ContactRequest {
        ContactRequest {
            name: "Ann".to_string(),
            email: email.to_string(),
            phone: phone.map(str::to_string),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_valid_submission_normalises() {
        let msg = request(" Ann@X.com ", " Hello ", Some("  ")).validate().unwrap();
        assert_eq!(msg.email, "ann@x.com");
        assert_eq!(msg.message, "Hello");
        assert_eq!(msg.phone, None);
    }

    #[test]
    fn test_missing_message_rejected() {
        assert!(request("ann@x.com", "   ", None).validate().is_err());
    }

    #[test]
    fn test_bad_email_rejected() {
        assert!(request("not-an-email", "Hi", None).validate().is_err());
    }
}
