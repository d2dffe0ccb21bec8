//! Order repository.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use cakeshop_core::{OrderId, OrderStatus, PaymentMethod, Price, UserId};

use super::RepositoryError;
use super::payments::PaymentRepository;
use crate::models::{AdminOrder, Order, OrderCustomer, OrderItem};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    items: Json<Vec<OrderItem>>,
    total: Price,
    status: OrderStatus,
    payment_method: PaymentMethod,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            items: row.items.0,
            total: row.total,
            status: row.status,
            payment_method: row.payment_method,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CustomerOrderRow {
    #[sqlx(flatten)]
    order: OrderRow,
    customer_name: String,
    customer_email: String,
}

/// Repository for order reads outside a transaction.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, items, total, status, payment_method, created_at, updated_at
            FROM cakeshop.orders
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, items, total, status, payment_method, created_at, updated_at
            FROM cakeshop.orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// Every order joined with its owner and payment, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<AdminOrder>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerOrderRow>(
            r"
            SELECT o.id, o.user_id, o.items, o.total, o.status, o.payment_method,
                   o.created_at, o.updated_at,
                   u.name AS customer_name, u.email AS customer_email
            FROM cakeshop.orders o
            JOIN cakeshop.users u ON u.id = o.user_id
            ORDER BY o.created_at DESC, o.id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<i32> = rows.iter().map(|r| r.order.id.as_i32()).collect();
        let mut payments: HashMap<OrderId, _> = PaymentRepository::new(self.pool)
            .list_for_orders(&ids)
            .await?
            .into_iter()
            .map(|p| (p.order_id, p))
            .collect();

        Ok(rows
            .into_iter()
            .map(|row| {
                let payment = payments.remove(&row.order.id);
                AdminOrder {
                    order: row.order.into(),
                    customer: OrderCustomer {
                        name: row.customer_name,
                        email: row.customer_email,
                    },
                    payment,
                }
            })
            .collect())
    }

    /// One order joined with its owner and payment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_admin(&self, id: OrderId) -> Result<Option<AdminOrder>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerOrderRow>(
            r"
            SELECT o.id, o.user_id, o.items, o.total, o.status, o.payment_method,
                   o.created_at, o.updated_at,
                   u.name AS customer_name, u.email AS customer_email
            FROM cakeshop.orders o
            JOIN cakeshop.users u ON u.id = o.user_id
            WHERE o.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let payment = PaymentRepository::new(self.pool).get_by_order(id).await?;

        Ok(Some(AdminOrder {
            order: row.order.into(),
            customer: OrderCustomer {
                name: row.customer_name,
                email: row.customer_email,
            },
            payment,
        }))
    }
}

/// Insert a new order with status `confirmed`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert(
    conn: &mut PgConnection,
    user_id: UserId,
    items: &[OrderItem],
    total: Price,
    payment_method: PaymentMethod,
) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(
        r"
        INSERT INTO cakeshop.orders (user_id, items, total, status, payment_method)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, items, total, status, payment_method, created_at, updated_at
        ",
    )
    .bind(user_id)
    .bind(Json(items))
    .bind(total)
    .bind(OrderStatus::Confirmed)
    .bind(payment_method)
    .fetch_one(conn)
    .await?;

    Ok(row.into())
}

/// Lock an order row for a status change.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock(conn: &mut PgConnection, id: OrderId) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(
        r"
        SELECT id, user_id, items, total, status, payment_method, created_at, updated_at
        FROM cakeshop.orders
        WHERE id = $1
        FOR UPDATE
        ",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(Order::from))
}

/// Set an order's status and stamp `updated_at`.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order vanished.
pub async fn set_status(
    conn: &mut PgConnection,
    id: OrderId,
    status: OrderStatus,
) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(
        r"
        UPDATE cakeshop.orders
        SET status = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING id, user_id, items, total, status, payment_method, created_at, updated_at
        ",
    )
    .bind(id)
    .bind(status)
    .fetch_optional(conn)
    .await?;

    row.map(Order::from).ok_or(RepositoryError::NotFound)
}

/// Move an order to `paid` if it is still awaiting payment.
///
/// Returns `false` when no row matched, in which case the caller must roll back.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn mark_paid(conn: &mut PgConnection, id: OrderId) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE cakeshop.orders
        SET status = 'paid', updated_at = NOW()
        WHERE id = $1 AND status IN ('pending', 'confirmed')
        ",
    )
    .bind(id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
