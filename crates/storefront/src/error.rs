//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding. Every error reaches the client as a JSON body
//! `{"message": "..."}`. All route handlers return `Result<T, AppError>`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::orders::OrderError;
use crate::services::payments::PaymentError;
use crate::services::users::UserAdminError;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Order operation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Payment operation failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Account management failed.
    #[error("User error: {0}")]
    Users(#[from] UserAdminError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or invalid session token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Valid session without the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// HTTP status and client-facing message.
    ///
    /// Internal details never reach the client.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Auth(err) => auth_status(err),
            Self::Cart(err) => match err {
                CartError::ProductNotFound(_) => {
                    (StatusCode::NOT_FOUND, "Product not found".to_string())
                }
                CartError::ItemNotFound(_) => {
                    (StatusCode::NOT_FOUND, "Item not found in cart".to_string())
                }
                CartError::Rule(rule) => (StatusCode::BAD_REQUEST, rule.to_string()),
                CartError::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_string()),
                CartError::Repository(err) => repository_status(err),
            },
            Self::Order(err) => match err {
                OrderError::EmptyCart => (StatusCode::BAD_REQUEST, "Cart is empty".to_string()),
                OrderError::InvalidPaymentMethod(msg) | OrderError::InvalidStatus(msg) => {
                    (StatusCode::BAD_REQUEST, msg.clone())
                }
                OrderError::NotFound(_) => (StatusCode::NOT_FOUND, "Order not found".to_string()),
                OrderError::Transition(t) => (StatusCode::CONFLICT, t.to_string()),
                OrderError::Forbidden => {
                    (StatusCode::FORBIDDEN, "Admin access required".to_string())
                }
                OrderError::Repository(err) => repository_status(err),
            },
            Self::Payment(err) => match err {
                PaymentError::InvalidMethod(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                PaymentError::InvalidCardData(card) => (StatusCode::BAD_REQUEST, card.to_string()),
                PaymentError::OrderNotFound(_) => {
                    (StatusCode::NOT_FOUND, "Order not found".to_string())
                }
                PaymentError::AlreadyPaid(_) => {
                    (StatusCode::CONFLICT, "Order already paid".to_string())
                }
                PaymentError::NotPayable { .. } => (StatusCode::CONFLICT, err.to_string()),
                PaymentError::Forbidden => {
                    (StatusCode::FORBIDDEN, "Admin access required".to_string())
                }
                PaymentError::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_string()),
                PaymentError::Repository(err) => repository_status(err),
            },
            Self::Users(err) => match err {
                UserAdminError::NotFound(_) => (StatusCode::NOT_FOUND, "User not found".to_string()),
                UserAdminError::ProtectedAdmin => (StatusCode::FORBIDDEN, err.to_string()),
                UserAdminError::InvalidEmail(_) => {
                    (StatusCode::BAD_REQUEST, "Invalid email address".to_string())
                }
                UserAdminError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                UserAdminError::EmailTaken | UserAdminError::HasOrders(_) => {
                    (StatusCode::CONFLICT, err.to_string())
                }
                UserAdminError::Repository(err) => repository_status(err),
            },
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        }
    }
}

fn repository_status(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
        RepositoryError::Conflict(msg) | RepositoryError::ForeignKey(msg) => {
            (StatusCode::CONFLICT, msg.clone())
        }
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
        }
    }
}

fn auth_status(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::InvalidCredentials => {
            (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
        }
        AuthError::InvalidToken => {
            (StatusCode::UNAUTHORIZED, "Invalid or expired token".to_string())
        }
        AuthError::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_string()),
        AuthError::UserAlreadyExists => (
            StatusCode::CONFLICT,
            "An account with this email already exists".to_string(),
        ),
        AuthError::InvalidEmail(_) => {
            (StatusCode::BAD_REQUEST, "Invalid email address".to_string())
        }
        AuthError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        AuthError::Repository(err) => repository_status(err),
        AuthError::TokenSigning(_) | AuthError::PasswordHash => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(json!({ "message": message }))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cakeshop_core::{
        CardError, CartRuleError, OrderId, OrderStatus, ProductId, TransitionError, UserId,
    };

    use super::*;

    fn get_status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(get_status(AppError::NotFound("test".to_string())), StatusCode::NOT_FOUND);
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(get_status(AppError::Forbidden("test".to_string())), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_domain_error_status_codes() {
        assert_eq!(get_status(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(AuthError::InvalidToken), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(AuthError::UserAlreadyExists), StatusCode::CONFLICT);
        assert_eq!(
            get_status(AuthError::Validation("name is required".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CartError::ProductNotFound(ProductId::new(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(CartError::Rule(CartRuleError::InvalidQuantity { got: 0 })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(OrderError::EmptyCart), StatusCode::BAD_REQUEST);
        assert_eq!(get_status(OrderError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(OrderError::NotFound(OrderId::new(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(OrderError::Transition(TransitionError::PaymentRequired)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(PaymentError::AlreadyPaid(OrderId::new(1))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(PaymentError::NotPayable {
                status: OrderStatus::Cancelled
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(PaymentError::InvalidCardData(CardError::BadLength)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(UserAdminError::ProtectedAdmin), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_missing_account_and_order_history() {
        // A token outliving its account must not surface as a server error.
        assert_eq!(get_status(CartError::UserNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            get_status(UserAdminError::HasOrders(UserId::new(4))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(RepositoryError::ForeignKey("orders reference user".to_string())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_store_failures_are_internal() {
        assert_eq!(
            get_status(RepositoryError::DataCorruption("bad row".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(CartError::Repository(RepositoryError::DataCorruption(
                "bad row".to_string()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(get_status(AuthError::PasswordHash), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_body_is_json_message() {
        let response = AppError::from(RepositoryError::DataCorruption(
            "pool exhausted at 10.0.0.3".to_string(),
        ))
        .into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "message": "Internal server error" }));
    }
}
