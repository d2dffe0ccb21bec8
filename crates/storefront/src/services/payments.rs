//! Payment recorder and card-on-file store.
//!
//! Card numbers are reduced to [`MaskedCard`] before anything else happens;
//! the full number is never logged or stored.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use cakeshop_core::{CardError, CardExpiry, MaskedCard, OrderId, OrderStatus, PaymentMethod};

use crate::db::payments::{self, NewPayment};
use crate::db::{CardInfoRepository, OrderRepository, PaymentRepository, RepositoryError, orders};
use crate::models::{CardOnFile, Order, Payment};
use crate::services::auth::Claims;

/// Errors from payment operations.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Payment method is not `cash` or `card`.
    #[error("{0}")]
    InvalidMethod(String),

    /// Card number or expiry is missing or malformed.
    #[error(transparent)]
    InvalidCardData(#[from] CardError),

    /// The order does not exist or belongs to someone else.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// A payment is already recorded for the order.
    #[error("order {0} is already paid")]
    AlreadyPaid(OrderId),

    /// The order's status does not accept a payment.
    #[error("cannot pay for an order that is {status}")]
    NotPayable { status: OrderStatus },

    /// The requester is not an admin.
    #[error("admin access required")]
    Forbidden,

    /// The account behind the token no longer exists.
    #[error("user not found")]
    UserNotFound,

    /// Database operation failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for PaymentError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Card details as submitted by a client.
#[derive(Debug, Clone, Copy, Default)]
pub struct CardDetails<'r> {
    pub number: Option<&'r str>,
    pub expiry: Option<&'r str>,
}

/// Validated card data, safe to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CheckedCard {
    card: MaskedCard,
    expiry: CardExpiry,
}

impl CardDetails<'_> {
    fn check(self) -> Result<CheckedCard, CardError> {
        let card = MaskedCard::from_number(self.number.unwrap_or_default())?;
        let expiry = CardExpiry::parse(self.expiry.unwrap_or_default())?;
        Ok(CheckedCard { card, expiry })
    }
}

/// Payment operations.
pub struct PaymentService<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentService<'a> {
    /// Create a new payment service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record the payment for an order and move the order to `paid`.
    ///
    /// The payment amount is the order total. Both writes commit together or
    /// not at all.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidMethod` or `PaymentError::InvalidCardData`
    /// before any store access, `PaymentError::OrderNotFound` if the order is
    /// absent or not visible to the requester, `PaymentError::AlreadyPaid`
    /// on a second payment and `PaymentError::NotPayable` for completed or
    /// cancelled orders.
    #[instrument(skip(self, card, claims), fields(user_id = %claims.sub))]
    pub async fn record(
        &self,
        order_id: OrderId,
        method: &str,
        card: CardDetails<'_>,
        claims: &Claims,
    ) -> Result<Payment, PaymentError> {
        let method: PaymentMethod = method.parse().map_err(PaymentError::InvalidMethod)?;
        let checked = match method {
            PaymentMethod::Card => Some(card.check()?),
            PaymentMethod::Cash => None,
        };

        let mut tx = self.pool.begin().await?;

        let order = orders::lock(&mut tx, order_id)
            .await?
            .filter(|order| visible_to(order, claims))
            .ok_or(PaymentError::OrderNotFound(order_id))?;

        if payments::exists_for_order(&mut tx, order_id).await? {
            return Err(PaymentError::AlreadyPaid(order_id));
        }
        if !order.status.accepts_payment() {
            return Err(PaymentError::NotPayable {
                status: order.status,
            });
        }

        let new_payment = NewPayment {
            order_id,
            user_id: order.user_id,
            method,
            card: checked.as_ref().map(|c| c.card.clone()),
            card_expiry: checked.as_ref().map(|c| c.expiry.to_string()),
            amount: order.total,
        };
        let payment = payments::insert(&mut tx, &new_payment)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => PaymentError::AlreadyPaid(order_id),
                other => PaymentError::Repository(other),
            })?;

        if !orders::mark_paid(&mut tx, order_id).await? {
            tx.rollback().await?;
            return Err(RepositoryError::DataCorruption(format!(
                "order {order_id} left a payable status while locked"
            ))
            .into());
        }
        tx.commit().await?;

        tracing::info!(
            order_id = %order_id,
            payment_id = %payment.id,
            amount = %payment.amount,
            method = %payment.method,
            "Payment recorded"
        );
        Ok(payment)
    }

    /// The payment for an order, or `None` if it is unpaid.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::OrderNotFound` if the order is absent or not
    /// visible to the requester.
    pub async fn get(
        &self,
        order_id: OrderId,
        claims: &Claims,
    ) -> Result<Option<Payment>, PaymentError> {
        OrderRepository::new(self.pool)
            .get(order_id)
            .await?
            .filter(|order| visible_to(order, claims))
            .ok_or(PaymentError::OrderNotFound(order_id))?;

        Ok(PaymentRepository::new(self.pool).get_by_order(order_id).await?)
    }

    /// All payments, newest first.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Forbidden` for non-admin claims.
    pub async fn list(&self, claims: &Claims) -> Result<Vec<Payment>, PaymentError> {
        require_admin(claims)?;
        Ok(PaymentRepository::new(self.pool).list().await?)
    }

    /// Save or replace the caller's card on file.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidCardData` for a bad number or expiry and
    /// `PaymentError::UserNotFound` if the account was deleted.
    #[instrument(skip(self, card, claims), fields(user_id = %claims.sub))]
    pub async fn save_card(
        &self,
        claims: &Claims,
        card: CardDetails<'_>,
    ) -> Result<CardOnFile, PaymentError> {
        let checked = card.check()?;

        let saved = CardInfoRepository::new(self.pool)
            .upsert(claims.user_id(), &checked.card, checked.expiry)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => PaymentError::UserNotFound,
                other => PaymentError::Repository(other),
            })?;

        tracing::info!(card = %saved.masked_card_suffix, "Card on file saved");
        Ok(saved)
    }

    /// All cards on file, most recently used first.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Forbidden` for non-admin claims.
    pub async fn list_cards(&self, claims: &Claims) -> Result<Vec<CardOnFile>, PaymentError> {
        require_admin(claims)?;
        Ok(CardInfoRepository::new(self.pool).list().await?)
    }
}

fn visible_to(order: &Order, claims: &Claims) -> bool {
    claims.is_admin || order.user_id == claims.user_id()
}

fn require_admin(claims: &Claims) -> Result<(), PaymentError> {
    if claims.is_admin {
        Ok(())
    } else {
        Err(PaymentError::Forbidden)
    }
}
