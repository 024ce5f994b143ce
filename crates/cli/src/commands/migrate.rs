//! Database migration command.
//!
//! Applies the embedded storefront migrations (`crates/storefront/migrations/`)
//! and creates the session store table.

use tower_sessions_sqlx_store::PostgresStore;

use super::{CliError, connect};

/// Run storefront migrations and the session store migration.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    bazaar_storefront::MIGRATOR.run(&pool).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool.clone()).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
