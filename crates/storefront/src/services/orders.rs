//! Order workflow.
//!
//! Placing an order turns the locked cart into an order row and deletes the
//! cart in one transaction. Status changes lock the order row and are checked
//! against [`OrderStatus::check_transition`].

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use cakeshop_core::{
    OrderId, OrderStatus, PaymentMethod, Price, PriceError, TransitionError, UserId,
};

use crate::db::carts::{self, LoadedLine};
use crate::db::{OrderRepository, RepositoryError, orders};
use crate::models::{AdminOrder, Order, OrderItem};
use crate::services::auth::Claims;

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The user has no cart or it has no items.
    #[error("cart is empty")]
    EmptyCart,

    /// Payment method is not `cash` or `card`.
    #[error("{0}")]
    InvalidPaymentMethod(String),

    /// The order does not exist.
    #[error("order {0} not found")]
    NotFound(OrderId),

    /// Requested status is not one of the defined values.
    #[error("{0}")]
    InvalidStatus(String),

    /// The status change is not allowed from the current status.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The requester is not an admin.
    #[error("admin access required")]
    Forbidden,

    /// Database operation failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Order placement, listing and admin status changes.
pub struct OrderService<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order from the user's cart and delete the cart.
    ///
    /// The order is created `confirmed` with a copy of the cart lines. Of two
    /// concurrent calls for one user, the second waits on the cart lock and
    /// then finds no cart.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidPaymentMethod` (before any store access)
    /// and `OrderError::EmptyCart` if there is nothing to order.
    #[instrument(skip(self))]
    pub async fn place(&self, user_id: UserId, payment_method: &str) -> Result<Order, OrderError> {
        let payment_method: PaymentMethod = payment_method
            .parse()
            .map_err(OrderError::InvalidPaymentMethod)?;

        let mut tx = self.pool.begin().await?;

        if !carts::lock(&mut tx, user_id).await? {
            return Err(OrderError::EmptyCart);
        }

        let lines = carts::load_lines(&mut tx, user_id).await?;
        if lines.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let (items, total) = snapshot_items(lines).map_err(|e| {
            RepositoryError::DataCorruption(format!("cart total for user {user_id}: {e}"))
        })?;

        let order = orders::insert(&mut tx, user_id, &items, total, payment_method).await?;
        carts::delete(&mut tx, user_id).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            total = %order.total,
            items = order.items.len(),
            method = %order.payment_method,
            "Order placed"
        );
        Ok(order)
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        Ok(OrderRepository::new(self.pool).list_for_user(user_id).await?)
    }

    /// Every order with owner and payment, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Forbidden` for non-admin claims.
    pub async fn list_all(&self, claims: &Claims) -> Result<Vec<AdminOrder>, OrderError> {
        require_admin(claims)?;
        Ok(OrderRepository::new(self.pool).list_all().await?)
    }

    /// Move an order to `status` on behalf of an admin.
    ///
    /// Setting the current status again succeeds without touching the row.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Forbidden` for non-admin claims,
    /// `OrderError::InvalidStatus` for an unknown status (both before any
    /// store access), `OrderError::NotFound` for an unknown order and
    /// `OrderError::Transition` when the state machine refuses the change.
    #[instrument(skip(self, claims), fields(admin_id = %claims.sub))]
    pub async fn update_status(
        &self,
        id: OrderId,
        status: &str,
        claims: &Claims,
    ) -> Result<AdminOrder, OrderError> {
        require_admin(claims)?;
        let next: OrderStatus = status.parse().map_err(OrderError::InvalidStatus)?;

        let mut tx = self.pool.begin().await?;

        let current = orders::lock(&mut tx, id)
            .await?
            .ok_or(OrderError::NotFound(id))?;

        current.status.check_transition(next)?;

        if current.status != next {
            orders::set_status(&mut tx, id, next).await?;
            tracing::info!(order_id = %id, from = %current.status, to = %next, "Order status changed");
        }
        tx.commit().await?;

        OrderRepository::new(self.pool)
            .get_admin(id)
            .await?
            .ok_or(OrderError::NotFound(id))
    }
}

fn require_admin(claims: &Claims) -> Result<(), OrderError> {
    if claims.is_admin {
        Ok(())
    } else {
        Err(OrderError::Forbidden)
    }
}

/// Detach cart lines into order lines and total them.
fn snapshot_items(lines: Vec<LoadedLine>) -> Result<(Vec<OrderItem>, Price), PriceError> {
    let mut total = Price::ZERO;
    let mut items = Vec::with_capacity(lines.len());

    for line in lines {
        total = total.plus(line.item.line_total()?)?;
        items.push(OrderItem {
            product_id: line.item.product_id,
            name: line.name,
            quantity: line.item.quantity,
            price: line.item.price,
        });
    }

    Ok((items, total))
}
