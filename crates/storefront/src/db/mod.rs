//! Database operations for the storefront `PostgreSQL`.
//!
//! # Schema: `cakeshop`
//!
//! ## Tables
//!
//! - `users` - Site accounts (argon2 password hashes, admin flag)
//! - `products` - Catalog
//! - `carts` / `cart_items` - One cart per user, lines ordered by `position`
//! - `orders` - Placed orders with a JSONB item snapshot; block deleting their user
//! - `payments` - At most one payment per order
//! - `card_info` - Card on file, one per user
//! - `contact_messages` - Contact form submissions
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p cakeshop-cli -- migrate
//! ```
//! or at server start when `STOREFRONT_RUN_MIGRATIONS=true`.

pub mod card_info;
pub mod carts;
pub mod contact;
pub mod orders;
pub mod payments;
pub mod products;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use thiserror::Error;

pub use card_info::CardInfoRepository;
pub use carts::CartRepository;
pub use contact::ContactRepository;
pub use orders::OrderRepository;
pub use payments::PaymentRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Embedded migrations from `crates/storefront/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A referenced row is missing, or referencing rows block a delete.
    #[error("foreign key violation: {0}")]
    ForeignKey(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
    pub(crate) fn from_unique_violation(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(what.to_owned());
        }
        Self::Database(err)
    }

    /// Map a foreign-key violation to `ForeignKey`, anything else to `Database`.
    pub(crate) fn from_foreign_key_violation(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_foreign_key_violation()
        {
            return Self::ForeignKey(what.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool.
///
/// Every connection carries a server-side `statement_timeout` equal to
/// `timeout`, and acquiring a connection gives up after the same duration,
/// so no store call can hang.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection cannot be established.
pub async fn create_pool(
    database_url: &SecretString,
    timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    let options = connect_options(database_url, timeout)?;
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(timeout)
        .connect_with(options)
        .await
}

/// Create a pool that connects on first use.
///
/// Used by the router tests, where requests are rejected before any query runs.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid.
pub fn create_lazy_pool(
    database_url: &SecretString,
    timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    let options = connect_options(database_url, timeout)?;
    Ok(PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(timeout)
        .connect_lazy_with(options))
}

fn connect_options(
    database_url: &SecretString,
    timeout: Duration,
) -> Result<PgConnectOptions, sqlx::Error> {
    let millis = timeout.as_millis().to_string();
    Ok(PgConnectOptions::from_str(database_url.expose_secret())?
        .options([("statement_timeout", millis.as_str())]))
}

/// Apply pending migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or the history is inconsistent.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
