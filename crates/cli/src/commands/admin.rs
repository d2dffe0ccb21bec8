//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! cakeshop-cli admin create -e admin@example.com -n "Admin Name" -p 'long-password'
//! ```

use cakeshop_storefront::services::seed;

use super::{CommandError, connect};

/// Create a new admin user.
///
/// Returns the ID of the created account. Fails if the email is taken.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<i32, CommandError> {
    let pool = connect().await?;

    tracing::info!("Creating admin user: {}", email);
    let user = seed::create_admin(&pool, name, email, password).await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );

    Ok(user.id.as_i32())
}
