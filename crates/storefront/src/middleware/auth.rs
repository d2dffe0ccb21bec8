//! Authentication extractors.
//!
//! Session tokens arrive as `Authorization: Bearer <jwt>`. Extraction never
//! touches the database; the claims are trusted once the signature and
//! expiry check out.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::services::auth::Claims;
use crate::state::AppState;

/// Extractor that requires a valid session token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(claims): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", claims.email)
/// }
/// ```
pub struct RequireAuth(pub Claims);

/// Extractor that requires a valid session token with the admin flag.
///
/// Rejects with 401 when the token is missing or invalid, 403 when valid but
/// not admin.
pub struct RequireAdmin(pub Claims);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

        let claims = state.tokens().validate(token)?;

        tracing::Span::current().record("user_id", tracing::field::display(&claims.sub));
        set_sentry_user(&claims.sub, Some(&claims.email));

        Ok(Self(claims))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(claims) = RequireAuth::from_request_parts(parts, state).await?;

        if !claims.is_admin {
            tracing::warn!(user_id = %claims.sub, path = %parts.uri.path(), "Admin access denied");
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        Ok(Self(claims))
    }
}

/// The token of a `Bearer` authorization header, if present.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
