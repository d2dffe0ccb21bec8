//! Idempotent bootstrap of the admin account and sample catalog.
//!
//! Safe to run from several processes at once: catalog seeding is serialized
//! by a transaction-scoped advisory lock and the admin insert is
//! `ON CONFLICT DO NOTHING`.

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use cakeshop_core::{Email, EmailError, Price};

use crate::config::AdminSeedConfig;
use crate::db::{RepositoryError, UserRepository, products};
use crate::models::{NewProduct, User};
use crate::services::auth::{self, AuthError};

/// Advisory lock key for catalog seeding.
const CATALOG_SEED_LOCK: i64 = 0x00ca_4e5e_ed01;

/// Display name given to the bootstrap admin.
const ADMIN_NAME: &str = "Admin";

/// `(name, description, price, image)` of the sample cakes.
const SAMPLE_CAKES: [(&str, &str, i64, &str); 5] = [
    (
        "Chocolate Truffle Cake",
        "Rich chocolate layers with truffle cream and dark chocolate ganache",
        299,
        "https://www.fnp.com/images/pr/l/v20221205201109/chocolate-truffle-cake-half-kg_1.jpg",
    ),
    (
        "Vanilla Berry Cake",
        "Light vanilla sponge with fresh mixed berries and whipped cream",
        249,
        "https://www.fnp.com/images/pr/l/v20221205201212/vanilla-fresh-cream-cake-half-kg_1.jpg",
    ),
    (
        "Red Velvet Cake",
        "Classic red velvet with cream cheese frosting",
        349,
        "https://www.fnp.com/images/pr/l/v20221205201156/red-velvet-fresh-cream-cake-half-kg_1.jpg",
    ),
    (
        "Black Forest Cake",
        "Chocolate sponge with cherries and whipped cream",
        399,
        "https://www.fnp.com/images/pr/l/v20221205201116/black-forest-cake-half-kg_1.jpg",
    ),
    (
        "Butterscotch Cake",
        "Soft vanilla cake with butterscotch chips and caramel",
        279,
        "https://www.fnp.com/images/pr/l/v20221205201120/butterscotch-cake-half-kg_1.jpg",
    ),
];

const SAMPLE_CATEGORY: &str = "birthday";

/// Errors from seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("invalid admin email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for SeedError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// What a seeding run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub admin_created: bool,
    pub admin_promoted: bool,
    pub products_inserted: usize,
}

/// Ensure the admin account and sample catalog exist.
///
/// # Errors
///
/// Returns `SeedError` if the admin email is invalid or the store fails.
#[instrument(skip(pool, admin), fields(admin_email = %admin.email))]
pub async fn ensure_seeded(pool: &PgPool, admin: &AdminSeedConfig) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();
    ensure_admin(pool, admin, &mut report).await?;
    report.products_inserted = ensure_catalog(pool).await?;

    tracing::info!(
        admin_created = report.admin_created,
        admin_promoted = report.admin_promoted,
        products_inserted = report.products_inserted,
        "Seeding complete"
    );
    Ok(report)
}

async fn ensure_admin(
    pool: &PgPool,
    admin: &AdminSeedConfig,
    report: &mut SeedReport,
) -> Result<(), SeedError> {
    let email = Email::parse(&admin.email)?;
    let users = UserRepository::new(pool);

    if let Some(existing) = users.get_by_email(&email).await? {
        if !existing.is_admin {
            users.promote_to_admin(existing.id).await?;
            report.admin_promoted = true;
            tracing::warn!(user_id = %existing.id, "Promoted existing user to admin");
        }
        return Ok(());
    }

    let Some(password) = admin.password.as_ref() else {
        tracing::warn!("STOREFRONT_ADMIN_PASSWORD not set, skipping admin account creation");
        return Ok(());
    };

    let password_hash = auth::hash_password(password.expose_secret())?;
    report.admin_created = users
        .insert_admin_if_absent(ADMIN_NAME, &email, &password_hash)
        .await?;
    Ok(())
}

async fn ensure_catalog(pool: &PgPool) -> Result<usize, SeedError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(CATALOG_SEED_LOCK)
        .execute(&mut *tx)
        .await?;

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cakeshop.products")
        .fetch_one(&mut *tx)
        .await?;
    if count > 0 {
        return Ok(0);
    }

    let cakes = sample_cakes()?;
    for cake in &cakes {
        products::insert(&mut tx, cake).await?;
    }
    tx.commit().await?;

    Ok(cakes.len())
}

fn sample_cakes() -> Result<Vec<NewProduct>, RepositoryError> {
    SAMPLE_CAKES
        .iter()
        .map(|&(name, description, price, image)| {
            Ok(NewProduct {
                name: name.to_owned(),
                description: description.to_owned(),
                price: Price::new(price)
                    .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?,
                image: image.to_owned(),
                category: SAMPLE_CATEGORY.to_owned(),
            })
        })
        .collect()
}

/// Create an admin account directly, as the CLI does.
///
/// # Errors
///
/// Returns `SeedError::Auth` for an invalid name, email or password, or if
/// the email is already registered.
pub async fn create_admin(
    pool: &PgPool,
    name: &str,
    email: &str,
    password: &str,
) -> Result<User, SeedError> {
    let name = auth::validate_name(name)?;
    let email = Email::parse(email)?;
    auth::validate_password(password)?;
    let password_hash = auth::hash_password(password)?;

    UserRepository::new(pool)
        .create(name, &email, &password_hash, true)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => SeedError::Auth(AuthError::UserAlreadyExists),
            other => SeedError::Repository(other),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_cakes() {
        let cakes = sample_cakes().unwrap();
        assert_eq!(cakes.len(), 5);
        assert!(cakes.iter().all(|c| c.category == "birthday"));
        let prices: Vec<i64> = cakes.iter().map(|c| c.price.amount()).collect();
        assert_eq!(prices, vec![299, 249, 349, 399, 279]);
    }
}
