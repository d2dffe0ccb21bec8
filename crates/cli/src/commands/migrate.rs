//! Database migration command.
//!
//! Migrations live in `crates/storefront/migrations/` and are embedded into
//! the storefront crate at compile time.

use cakeshop_storefront::db;

use super::{CommandError, connect};

/// Apply pending storefront migrations.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    db::run_migrations(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
