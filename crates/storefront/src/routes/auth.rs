//! Signup and login handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, add_breadcrumb};
use crate::extract::ApiJson;
use crate::models::User;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Signup request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: &'static str,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    pub user: User,
}

/// Create an account.
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = AuthService::new(state.pool(), state.tokens())
        .signup(&body.name, &body.email, &body.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created successfully",
            user,
        }),
    ))
}

/// Exchange credentials for a session token.
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (token, user) = AuthService::new(state.pool(), state.tokens())
        .login(&body.email, &body.password)
        .await?;

    add_breadcrumb("auth", "User logged in", None);

    Ok(Json(LoginResponse {
        message: "Login successful",
        token,
        user,
    }))
}
