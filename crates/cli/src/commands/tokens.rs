//! Password reset token maintenance.

use bazaar_storefront::db::ResetTokenRepository;

use super::{CliError, connect};

/// Delete used and expired reset tokens. Returns the number removed.
pub async fn purge() -> Result<u64, CliError> {
    let pool = connect().await?;
    let removed = ResetTokenRepository::new(&pool).purge_stale().await?;

    tracing::info!("Removed {removed} stale password reset tokens");
    Ok(removed)
}
