//! Payment repository.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use cakeshop_core::{MaskedCard, OrderId, PaymentId, PaymentMethod, Price, UserId};

use super::RepositoryError;
use crate::models::Payment;

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: PaymentId,
    order_id: OrderId,
    user_id: UserId,
    method: PaymentMethod,
    card_last4: Option<String>,
    card_expiry: Option<String>,
    amount: Price,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = RepositoryError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let masked_card_suffix = row
            .card_last4
            .as_deref()
            .map(|s| {
                MaskedCard::from_suffix(s).ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "invalid card suffix on payment {}",
                        row.id
                    ))
                })
            })
            .transpose()?;

        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            user_id: row.user_id,
            method: row.method,
            masked_card_suffix,
            card_expiry: row.card_expiry,
            amount: row.amount,
            created_at: row.created_at,
        })
    }
}

/// Fields of a payment about to be recorded.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub method: PaymentMethod,
    pub card: Option<MaskedCard>,
    pub card_expiry: Option<String>,
    pub amount: Price,
}

/// Repository for payment reads.
pub struct PaymentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentRepository<'a> {
    /// Create a new payment repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The payment for an order, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Payment>, RepositoryError> {
        sqlx::query_as::<_, PaymentRow>(
            r"
            SELECT id, order_id, user_id, method, card_last4, card_expiry, amount, created_at
            FROM cakeshop.payments
            WHERE order_id = $1
            ",
        )
        .bind(order_id)
        .fetch_optional(self.pool)
        .await?
        .map(Payment::try_from)
        .transpose()
    }

    /// All payments, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Payment>, RepositoryError> {
        sqlx::query_as::<_, PaymentRow>(
            r"
            SELECT id, order_id, user_id, method, card_last4, card_expiry, amount, created_at
            FROM cakeshop.payments
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(Payment::try_from)
        .collect()
    }

    /// Payments belonging to any of `order_ids`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_orders(&self, order_ids: &[i32]) -> Result<Vec<Payment>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, PaymentRow>(
            r"
            SELECT id, order_id, user_id, method, card_last4, card_expiry, amount, created_at
            FROM cakeshop.payments
            WHERE order_id = ANY($1)
            ",
        )
        .bind(order_ids)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(Payment::try_from)
        .collect()
    }
}

/// Whether a payment already exists for an order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn exists_for_order(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<bool, RepositoryError> {
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM cakeshop.payments WHERE order_id = $1)",
    )
    .bind(order_id)
    .fetch_one(conn)
    .await?;
    Ok(exists)
}

/// Insert a payment.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the order already has a payment.
pub async fn insert(conn: &mut PgConnection, payment: &NewPayment) -> Result<Payment, RepositoryError> {
    sqlx::query_as::<_, PaymentRow>(
        r"
        INSERT INTO cakeshop.payments (order_id, user_id, method, card_last4, card_expiry, amount)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, order_id, user_id, method, card_last4, card_expiry, amount, created_at
        ",
    )
    .bind(payment.order_id)
    .bind(payment.user_id)
    .bind(payment.method)
    .bind(payment.card.as_ref().map(MaskedCard::suffix))
    .bind(payment.card_expiry.as_deref())
    .bind(payment.amount)
    .fetch_one(conn)
    .await
    .map_err(|e| RepositoryError::from_unique_violation(e, "order already paid"))?
    .try_into()
}
