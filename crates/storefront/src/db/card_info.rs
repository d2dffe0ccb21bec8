//! Card-on-file repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use cakeshop_core::{CardExpiry, CardInfoId, MaskedCard, UserId};

use super::RepositoryError;
use crate::models::CardOnFile;

#[derive(sqlx::FromRow)]
struct CardInfoRow {
    id: CardInfoId,
    user_id: UserId,
    user_name: String,
    user_email: String,
    card_last4: String,
    card_expiry: String,
    last_used: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CardInfoRow> for CardOnFile {
    type Error = RepositoryError;

    fn try_from(row: CardInfoRow) -> Result<Self, Self::Error> {
        let masked_card_suffix = MaskedCard::from_suffix(&row.card_last4).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("invalid card suffix on card {}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            user_email: row.user_email,
            masked_card_suffix,
            card_expiry: row.card_expiry,
            last_used: row.last_used,
            created_at: row.created_at,
        })
    }
}

/// Repository for cards on file.
pub struct CardInfoRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CardInfoRepository<'a> {
    /// Create a new card-info repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace a user's card on file.
    ///
    /// The user's name and email are copied from `users` on first save and
    /// kept on later updates; `last_used` is bumped every time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn upsert(
        &self,
        user_id: UserId,
        card: &MaskedCard,
        expiry: CardExpiry,
    ) -> Result<CardOnFile, RepositoryError> {
        sqlx::query_as::<_, CardInfoRow>(
            r"
            INSERT INTO cakeshop.card_info (user_id, user_name, user_email, card_last4, card_expiry)
            SELECT id, name, email, $2, $3
            FROM cakeshop.users
            WHERE id = $1
            ON CONFLICT (user_id) DO UPDATE
            SET card_last4 = EXCLUDED.card_last4,
                card_expiry = EXCLUDED.card_expiry,
                last_used = NOW()
            RETURNING id, user_id, user_name, user_email, card_last4, card_expiry,
                      last_used, created_at
            ",
        )
        .bind(user_id)
        .bind(card.suffix())
        .bind(expiry.to_string())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?
        .try_into()
    }

    /// All cards on file, most recently used first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<CardOnFile>, RepositoryError> {
        sqlx::query_as::<_, CardInfoRow>(
            r"
            SELECT id, user_id, user_name, user_email, card_last4, card_expiry,
                   last_used, created_at
            FROM cakeshop.card_info
            ORDER BY last_used DESC
            ",
        )
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(CardOnFile::try_from)
        .collect()
    }
}
