//! Admin management of customer accounts.
//!
//! Admin accounts are read-only here: updates and deletes against them are
//! refused whoever asks.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use cakeshop_core::{Email, EmailError, UserId};

use crate::db::{RepositoryError, UserRepository};
use crate::models::User;
use crate::services::auth::{self, AuthError};

/// Errors from account management.
#[derive(Debug, Error)]
pub enum UserAdminError {
    #[error("user {0} not found")]
    NotFound(UserId),

    #[error("admin accounts cannot be modified or deleted")]
    ProtectedAdmin,

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("{0}")]
    Validation(String),

    #[error("an account with this email already exists")]
    EmailTaken,

    #[error("user {0} has placed orders and cannot be deleted")]
    HasOrders(UserId),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Partial profile update; absent fields keep their value.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate<'r> {
    pub name: Option<&'r str>,
    pub email: Option<&'r str>,
}

/// Account management for admins.
pub struct UserAdminService<'a> {
    users: UserRepository<'a>,
}

impl<'a> UserAdminService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// All accounts, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `UserAdminError::Repository` if the store fails.
    pub async fn list(&self) -> Result<Vec<User>, UserAdminError> {
        Ok(self.users.list().await?)
    }

    /// Change a customer's name and/or email.
    ///
    /// # Errors
    ///
    /// Returns `UserAdminError::NotFound` for an unknown id,
    /// `UserAdminError::ProtectedAdmin` for an admin account and
    /// `UserAdminError::EmailTaken` if the email belongs to someone else.
    #[instrument(skip(self, update))]
    pub async fn update(&self, id: UserId, update: UserUpdate<'_>) -> Result<User, UserAdminError> {
        let name = update
            .name
            .map(auth::validate_name)
            .transpose()
            .map_err(validation)?;
        let email = update.email.map(Email::parse).transpose()?;

        let existing = self.protected_lookup(id).await?;

        let name = name.unwrap_or(&existing.name);
        let email = email.as_ref().unwrap_or(&existing.email);

        self.users
            .update_profile(id, name, email)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => UserAdminError::EmailTaken,
                other => UserAdminError::Repository(other),
            })?
            .ok_or(UserAdminError::NotFound(id))
    }

    /// Delete a customer account. Its cart and card on file go with it.
    ///
    /// # Errors
    ///
    /// Returns `UserAdminError::NotFound` for an unknown id,
    /// `UserAdminError::ProtectedAdmin` for an admin account and
    /// `UserAdminError::HasOrders` if the customer has order history.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: UserId) -> Result<(), UserAdminError> {
        self.protected_lookup(id).await?;

        let deleted = self.users.delete_non_admin(id).await.map_err(|e| match e {
            RepositoryError::ForeignKey(_) => UserAdminError::HasOrders(id),
            other => UserAdminError::Repository(other),
        })?;
        if !deleted {
            // Promoted or deleted since the lookup.
            return Err(UserAdminError::ProtectedAdmin);
        }
        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }

    async fn protected_lookup(&self, id: UserId) -> Result<User, UserAdminError> {
        let user = self
            .users
            .get_by_id(id)
            .await?
            .ok_or(UserAdminError::NotFound(id))?;
        if user.is_admin {
            tracing::warn!(user_id = %id, "Refused change to admin account");
            return Err(UserAdminError::ProtectedAdmin);
        }
        Ok(user)
    }
}

fn validation(err: AuthError) -> UserAdminError {
    match err {
        AuthError::Validation(msg) => UserAdminError::Validation(msg),
        other => UserAdminError::Validation(other.to_string()),
    }
}
