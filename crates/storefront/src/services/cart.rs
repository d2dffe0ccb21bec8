//! Cart manager.
//!
//! Every mutation runs in its own transaction holding the cart row lock, so
//! concurrent adds and quantity changes on one cart apply one after another.
//! The merge rules themselves live in [`cakeshop_core::Cart`].

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use cakeshop_core::{Cart, CartRuleError, MAX_ITEM_QUANTITY, ProductId, UserId};

use crate::db::{RepositoryError, carts, products};
use crate::models::CartView;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product does not exist in the catalog.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// The product is not in the user's cart.
    #[error("item {0} not found in cart")]
    ItemNotFound(ProductId),

    /// The account behind the session was deleted.
    #[error("user not found")]
    UserNotFound,

    /// A cart rule was violated.
    #[error(transparent)]
    Rule(CartRuleError),

    /// Database operation failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<CartRuleError> for CartError {
    fn from(err: CartRuleError) -> Self {
        match err {
            CartRuleError::ItemNotFound(id) => Self::ItemNotFound(id),
            other => Self::Rule(other),
        }
    }
}

impl From<sqlx::Error> for CartError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Per-user cart operations.
pub struct CartService<'a> {
    pool: &'a PgPool,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's cart with its derived total. A user without a cart sees an
    /// empty one; nothing is created.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn snapshot(&self, user_id: UserId) -> Result<CartView, CartError> {
        Ok(carts::CartRepository::new(self.pool).view(user_id).await?)
    }

    /// Add `quantity` of a product, merging into an existing line.
    ///
    /// The cart is created on first add. A merged line keeps the price it was
    /// first added at.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Rule` for a quantity outside 1..=999 (before any
    /// store access), `CartError::ProductNotFound` for an unknown product and
    /// `CartError::UserNotFound` if the account was deleted after the token
    /// was issued.
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartView, CartError> {
        if !(1..=i64::from(MAX_ITEM_QUANTITY)).contains(&quantity) {
            return Err(CartRuleError::InvalidQuantity { got: quantity }.into());
        }

        let mut tx = self.pool.begin().await?;

        let price = products::price_of(&mut tx, product_id)
            .await?
            .ok_or(CartError::ProductNotFound(product_id))?;

        carts::lock_or_create(&mut tx, user_id)
            .await
            .map_err(|e| match e {
                RepositoryError::ForeignKey(_) => CartError::UserNotFound,
                other => CartError::Repository(other),
            })?;
        let mut cart = load_cart(&mut tx, user_id).await?;
        cart.add(product_id, quantity, price)?;
        carts::replace_items(&mut tx, user_id, cart.items()).await?;

        let view = carts::view(&mut tx, user_id).await?;
        tx.commit().await?;

        tracing::debug!(items = view.items.len(), total = %view.total, "Cart updated");
        Ok(view)
    }

    /// Remove a product's line from the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the cart has no such line.
    #[instrument(skip(self))]
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartView, CartError> {
        self.mutate(user_id, product_id, |cart| cart.remove(product_id).map(drop))
            .await
    }

    /// Overwrite a line's quantity; below 1 removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the cart has no such line and
    /// `CartError::Rule` for a quantity above 999.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartView, CartError> {
        if quantity > i64::from(MAX_ITEM_QUANTITY) {
            return Err(CartRuleError::InvalidQuantity { got: quantity }.into());
        }

        self.mutate(user_id, product_id, |cart| {
            cart.set_quantity(product_id, quantity).map(drop)
        })
        .await
    }

    /// Lock an existing cart, apply `change`, persist and return the result.
    async fn mutate<F>(
        &self,
        user_id: UserId,
        product_id: ProductId,
        change: F,
    ) -> Result<CartView, CartError>
    where
        F: FnOnce(&mut Cart) -> Result<(), CartRuleError>,
    {
        let mut tx = self.pool.begin().await?;

        if !carts::lock(&mut tx, user_id).await? {
            return Err(CartError::ItemNotFound(product_id));
        }

        let mut cart = load_cart(&mut tx, user_id).await?;
        change(&mut cart)?;
        carts::replace_items(&mut tx, user_id, cart.items()).await?;

        let view = carts::view(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(view)
    }
}

async fn load_cart(
    conn: &mut sqlx::PgConnection,
    user_id: UserId,
) -> Result<Cart, RepositoryError> {
    let lines = carts::load_lines(conn, user_id).await?;
    Ok(Cart::from_items(user_id, lines.into_iter().map(|line| line.item)))
}
