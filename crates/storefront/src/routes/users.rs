//! Profile and admin account management handlers.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cakeshop_core::UserId;

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::User;
use crate::services::auth::AuthService;
use crate::services::users::{UserAdminService, UserUpdate};
use crate::state::AppState;

/// Admin profile update body. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// The caller's own account.
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<Json<User>, AppError> {
    let user = AuthService::new(state.pool(), state.tokens())
        .profile(claims.user_id())
        .await?;
    Ok(Json(user))
}

/// All accounts.
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(UserAdminService::new(state.pool()).list().await?))
}

/// Update a customer account.
#[instrument(skip(state, claims, body), fields(admin_id = %claims.sub))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(claims): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(body): ApiJson<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    let update = UserUpdate {
        name: body.name.as_deref(),
        email: body.email.as_deref(),
    };
    let user = UserAdminService::new(state.pool()).update(id, update).await?;
    Ok(Json(user))
}

/// Delete a customer account.
#[instrument(skip(state, claims), fields(admin_id = %claims.sub))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(claims): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<MessageResponse>, AppError> {
    UserAdminService::new(state.pool()).delete(id).await?;
    Ok(Json(MessageResponse {
        message: "User deleted successfully",
    }))
}
