//! Subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod tokens;
pub mod users;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use bazaar_storefront::db::RepositoryError;
use bazaar_storefront::forms::FormErrors;
use bazaar_storefront::services::AuthError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid role: {0}. Valid roles: vendor, buyer")]
    InvalidRole(String),

    /// The account details failed validation.
    #[error("Invalid account details:\n{0}")]
    Validation(FormErrors),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Connect to the storefront database named by the environment.
pub(crate) async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("BAZAAR_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CliError::MissingEnvVar("BAZAAR_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    Ok(bazaar_storefront::db::create_pool(&SecretString::from(database_url)).await?)
}
