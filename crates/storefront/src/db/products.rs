//! Catalog repository.

use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use cakeshop_core::{Price, ProductId};

use super::RepositoryError;
use crate::models::{NewProduct, Product};

/// Repository for catalog database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all products ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            r"
            SELECT id, name, description, price, image, category, created_at, updated_at
            FROM cakeshop.products
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            SELECT id, name, description, price, image, category, created_at, updated_at
            FROM cakeshop.products
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Search by case-insensitive substring of name or description and an
    /// exact (case-insensitive) category. Either filter may be absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let pattern = query.map(|q| format!("%{}%", escape_like(q)));

        let products = sqlx::query_as::<_, Product>(
            r"
            SELECT id, name, description, price, image, category, created_at, updated_at
            FROM cakeshop.products
            WHERE ($1::TEXT IS NULL OR name ILIKE $1 OR description ILIKE $1)
              AND ($2::TEXT IS NULL OR lower(category) = lower($2))
            ORDER BY id
            ",
        )
        .bind(pattern)
        .bind(category)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        insert(&mut *self.pool.acquire().await?, product).await
    }

    /// Replace all editable fields of a product.
    ///
    /// Returns `None` if the product does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update(
        &self,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<Option<Product>, RepositoryError> {
        let updated = sqlx::query_as::<_, Product>(
            r"
            UPDATE cakeshop.products
            SET name = $2, description = $3, price = $4, image = $5, category = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, price, image, category, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.image)
        .bind(&product.category)
        .fetch_optional(self.pool)
        .await?;

        Ok(updated)
    }

    /// Delete a product. Cart lines referencing it go with it; orders keep
    /// their snapshot.
    ///
    /// Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cakeshop.products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Insert a product on an existing connection or transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert(
    conn: &mut PgConnection,
    product: &NewProduct,
) -> Result<Product, RepositoryError> {
    let created = sqlx::query_as::<_, Product>(
        r"
        INSERT INTO cakeshop.products (name, description, price, image, category)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, description, price, image, category, created_at, updated_at
        ",
    )
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(&product.image)
    .bind(&product.category)
    .fetch_one(conn)
    .await?;

    Ok(created)
}

/// Current catalog price of a product, read inside the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn price_of(
    conn: &mut PgConnection,
    id: ProductId,
) -> Result<Option<Price>, RepositoryError> {
    let row: Option<(Price,)> =
        sqlx::query_as("SELECT price FROM cakeshop.products WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
    Ok(row.map(|(price,)| price))
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
