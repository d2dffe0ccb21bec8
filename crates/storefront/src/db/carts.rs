//! Cart persistence.
//!
//! The `carts` row is the per-user lock: every mutating path locks it with
//! `SELECT ... FOR UPDATE` before reading lines, so concurrent writers on
//! the same cart serialize. All functions here run on a caller-supplied
//! connection, normally an open transaction.

use sqlx::{PgConnection, PgPool};

use cakeshop_core::{CartItem, Price, ProductId, UserId};

use super::RepositoryError;
use crate::models::{CartLine, CartView};

#[derive(sqlx::FromRow)]
struct CartLineRow {
    product_id: ProductId,
    name: String,
    image: String,
    quantity: i32,
    price: Price,
}

impl CartLineRow {
    fn quantity(&self) -> Result<u32, RepositoryError> {
        u32::try_from(self.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "negative quantity {} for product {}",
                self.quantity, self.product_id
            ))
        })
    }
}

/// A cart line as loaded for checkout, carrying the product name.
#[derive(Debug, Clone)]
pub struct LoadedLine {
    pub item: CartItem,
    pub name: String,
}

/// Repository for read-only cart access outside a transaction.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Snapshot of a user's cart; empty if the user has none.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn view(&self, user_id: UserId) -> Result<CartView, RepositoryError> {
        view(&mut *self.pool.acquire().await?, user_id).await
    }
}

/// Create the cart row if absent, then lock it.
///
/// # Errors
///
/// Returns `RepositoryError::ForeignKey` if the user no longer exists,
/// `RepositoryError::Database` if a statement fails, or
/// `RepositoryError::NotFound` if concurrent checkouts keep deleting the
/// row between the insert and the lock.
pub async fn lock_or_create(conn: &mut PgConnection, user_id: UserId) -> Result<(), RepositoryError> {
    const ATTEMPTS: usize = 3;

    for _ in 0..ATTEMPTS {
        sqlx::query(
            r"
            INSERT INTO cakeshop.carts (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            RepositoryError::from_foreign_key_violation(e, &format!("user {user_id} not found"))
        })?;

        if lock(&mut *conn, user_id).await? {
            return Ok(());
        }
    }

    Err(RepositoryError::NotFound)
}

/// Lock an existing cart row.
///
/// Returns `false` if the user has no cart. A caller blocked behind a
/// checkout that deletes the cart observes `false` once that commits.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock(conn: &mut PgConnection, user_id: UserId) -> Result<bool, RepositoryError> {
    let row: Option<(UserId,)> = sqlx::query_as(
        r"
        SELECT user_id FROM cakeshop.carts
        WHERE user_id = $1
        FOR UPDATE
        ",
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.is_some())
}

async fn fetch_rows(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Vec<CartLineRow>, RepositoryError> {
    let rows = sqlx::query_as::<_, CartLineRow>(
        r"
        SELECT ci.product_id, p.name, p.image, ci.quantity, ci.price
        FROM cakeshop.cart_items ci
        JOIN cakeshop.products p ON p.id = ci.product_id
        WHERE ci.user_id = $1
        ORDER BY ci.position
        ",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

/// Load the lines of a cart in insertion order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails and
/// `RepositoryError::DataCorruption` for an impossible stored quantity.
pub async fn load_lines(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Vec<LoadedLine>, RepositoryError> {
    fetch_rows(conn, user_id)
        .await?
        .into_iter()
        .map(|row| {
            Ok(LoadedLine {
                item: CartItem {
                    product_id: row.product_id,
                    quantity: row.quantity()?,
                    price: row.price,
                },
                name: row.name,
            })
        })
        .collect()
}

/// Snapshot of a cart with display fields and the derived total.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails and
/// `RepositoryError::DataCorruption` if stored lines are invalid.
pub async fn view(conn: &mut PgConnection, user_id: UserId) -> Result<CartView, RepositoryError> {
    let mut items = Vec::new();
    let mut total = Price::ZERO;

    for row in fetch_rows(conn, user_id).await? {
        let quantity = row.quantity()?;
        let line_total = row.price.times(quantity).map_err(overflow)?;
        total = total.plus(line_total).map_err(overflow)?;
        items.push(CartLine {
            product_id: row.product_id,
            name: row.name,
            image: row.image,
            quantity,
            price: row.price,
            line_total,
        });
    }

    Ok(CartView { items, total })
}

/// Replace all stored lines of a locked cart with `items`, preserving order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a statement fails.
pub async fn replace_items(
    conn: &mut PgConnection,
    user_id: UserId,
    items: &[CartItem],
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM cakeshop.cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    for (position, item) in items.iter().enumerate() {
        let quantity = i32::try_from(item.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("quantity {} out of range", item.quantity))
        })?;
        let position = i32::try_from(position)
            .map_err(|_| RepositoryError::DataCorruption("cart too large".to_owned()))?;

        sqlx::query(
            r"
            INSERT INTO cakeshop.cart_items (user_id, product_id, quantity, price, position)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(user_id)
        .bind(item.product_id)
        .bind(quantity)
        .bind(item.price)
        .bind(position)
        .execute(&mut *conn)
        .await?;
    }

    sqlx::query("UPDATE cakeshop.carts SET updated_at = NOW() WHERE user_id = $1")
        .bind(user_id)
        .execute(conn)
        .await?;

    Ok(())
}

/// Delete the cart row; its lines cascade.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn delete(conn: &mut PgConnection, user_id: UserId) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM cakeshop.carts WHERE user_id = $1")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

fn overflow(err: cakeshop_core::PriceError) -> RepositoryError {
    RepositoryError::DataCorruption(format!("cart total: {err}"))
}
