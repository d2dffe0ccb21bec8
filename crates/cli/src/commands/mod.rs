//! CLI subcommands.

pub mod admin;
pub mod migrate;
pub mod seed;

use std::time::Duration;

use cakeshop_storefront::db;
use cakeshop_storefront::services::seed::SeedError;
use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Statement and acquire timeout for CLI connections.
const CLI_DB_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors shared by all subcommands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Seeding or account creation failed.
    #[error(transparent)]
    Seed(#[from] SeedError),
}

/// Database URL from `STOREFRONT_DATABASE_URL`, falling back to `DATABASE_URL`.
fn database_url() -> Result<SecretString, CommandError> {
    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("STOREFRONT_DATABASE_URL"))
}

/// Load `.env` and connect.
async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();
    let url = database_url()?;

    tracing::info!("Connecting to storefront database...");
    Ok(db::create_pool(&url, CLI_DB_TIMEOUT).await?)
}
