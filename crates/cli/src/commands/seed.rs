//! Seed command: the same idempotent step the server runs at startup.

use cakeshop_storefront::config::{AdminSeedConfig, DEFAULT_ADMIN_EMAIL};
use cakeshop_storefront::services::seed::ensure_seeded;
use secrecy::SecretString;

use super::{CommandError, connect};

/// Create the configured admin and the sample catalog if absent.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    let admin = AdminSeedConfig {
        email: std::env::var("STOREFRONT_ADMIN_EMAIL")
            .unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.to_owned()),
        password: std::env::var("STOREFRONT_ADMIN_PASSWORD")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(SecretString::from),
    };

    let report = ensure_seeded(&pool, &admin).await?;

    tracing::info!("Seeding complete!");
    tracing::info!("  Admin created: {}", report.admin_created);
    tracing::info!("  Admin promoted: {}", report.admin_promoted);
    tracing::info!("  Products inserted: {}", report.products_inserted);
    Ok(())
}
