//! Back-office inspection and cleanup.
//!
//! # Usage
//!
//! ```bash
//! # Newest 20 orders
//! bazaar-cli admin list orders --limit 20
//!
//! # Remove a store, its products and their images
//! bazaar-cli admin delete stores 42
//! ```
//!
//! Product images are removed from `BAZAAR_MEDIA_ROOT` (default `media`).

use bazaar_storefront::db::admin::AdminRow;
use bazaar_storefront::db::{AdminRepository, Entity};
use bazaar_storefront::services::MediaStorage;

use super::{CliError, connect};

/// Print the newest `limit` rows of `entity`.
pub async fn list(entity: Entity, limit: i64) -> Result<(), CliError> {
    let pool = connect().await?;
    let rows = AdminRepository::new(&pool).list(entity, limit).await?;
    print_rows(entity, &rows);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_rows(entity: Entity, rows: &[AdminRow]) {
    if rows.is_empty() {
        println!("No {entity} found.");
    }
    for row in rows {
        println!("{row}");
    }
}

/// Delete one row of `entity` and any product images it took with it.
pub async fn delete(entity: Entity, id: i32) -> Result<(), CliError> {
    let pool = connect().await?;
    let deleted = AdminRepository::new(&pool).delete(entity, id).await?;

    let media_root = std::env::var("BAZAAR_MEDIA_ROOT").unwrap_or_else(|_| "media".to_owned());
    let media = MediaStorage::new(media_root);
    for path in &deleted.image_paths {
        media.delete(path).await;
    }

    tracing::info!(
        "Deleted {entity} #{id} ({} product images removed)",
        deleted.image_paths.len()
    );
    Ok(())
}
