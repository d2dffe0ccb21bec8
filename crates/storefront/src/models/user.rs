//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use cakeshop_core::{Email, UserId};

/// A site account as exposed to clients. The password hash never leaves
/// the repository.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
