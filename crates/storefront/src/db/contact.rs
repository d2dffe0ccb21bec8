//! Contact message repository.

use sqlx::PgPool;

use cakeshop_core::{ContactMessageId, ContactStatus};

use super::RepositoryError;
use crate::models::{ContactMessage, NewContactMessage};

/// Repository for contact form submissions.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    /// Create a new contact repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new message with status `new`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        message: &NewContactMessage,
    ) -> Result<ContactMessage, RepositoryError> {
        let created = sqlx::query_as::<_, ContactMessage>(
            r"
            INSERT INTO cakeshop.contact_messages (name, email, phone, message)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, phone, message, status, created_at
            ",
        )
        .bind(&message.name)
        .bind(&message.email)
        .bind(message.phone.as_deref())
        .bind(&message.message)
        .fetch_one(self.pool)
        .await?;

        Ok(created)
    }

    /// All messages, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<ContactMessage>, RepositoryError> {
        let messages = sqlx::query_as::<_, ContactMessage>(
            r"
            SELECT id, name, email, phone, message, status, created_at
            FROM cakeshop.contact_messages
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(messages)
    }

    /// Set a message's status.
    ///
    /// Returns `None` if the message does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_status(
        &self,
        id: ContactMessageId,
        status: ContactStatus,
    ) -> Result<Option<ContactMessage>, RepositoryError> {
        let updated = sqlx::query_as::<_, ContactMessage>(
            r"
            UPDATE cakeshop.contact_messages
            SET status = $2
            WHERE id = $1
            RETURNING id, name, email, phone, message, status, created_at
            ",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?;

        Ok(updated)
    }
}
