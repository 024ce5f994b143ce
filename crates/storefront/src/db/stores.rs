//! Store repository.
//!
//! Vendor-facing lookups are always scoped to the owning vendor so that a
//! foreign store id behaves exactly like a missing one.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bazaar_core::{StoreId, UserId};

use super::RepositoryError;
use crate::models::Store;

#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: StoreId,
    name: String,
    description: String,
    vendor_id: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            vendor_id: row.vendor_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for store database operations.
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All stores, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(
            r"
            SELECT id, name, description, vendor_id, created_at, updated_at
            FROM bazaar.store
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// A vendor's stores, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_vendor(&self, vendor_id: UserId) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(
            r"
            SELECT id, name, description, vendor_id, created_at, updated_at
            FROM bazaar.store
            WHERE vendor_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(vendor_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get any store by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(
            r"
            SELECT id, name, description, vendor_id, created_at, updated_at
            FROM bazaar.store
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get a store only if `vendor_id` owns it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_vendor(
        &self,
        id: StoreId,
        vendor_id: UserId,
    ) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(
            r"
            SELECT id, name, description, vendor_id, created_at, updated_at
            FROM bazaar.store
            WHERE id = $1 AND vendor_id = $2
            ",
        )
        .bind(id)
        .bind(vendor_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create a store owned by `vendor_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        vendor_id: UserId,
        name: &str,
        description: &str,
    ) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(
            r"
            INSERT INTO bazaar.store (name, description, vendor_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, vendor_id, created_at, updated_at
            ",
        )
        .bind(name)
        .bind(description)
        .bind(vendor_id)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Update a vendor's store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store does not exist or
    /// belongs to another vendor.
    pub async fn update(
        &self,
        id: StoreId,
        vendor_id: UserId,
        name: &str,
        description: &str,
    ) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(
            r"
            UPDATE bazaar.store
            SET name = $3, description = $4, updated_at = NOW()
            WHERE id = $1 AND vendor_id = $2
            RETURNING id, name, description, vendor_id, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(vendor_id)
        .bind(name)
        .bind(description)
        .fetch_optional(self.pool)
        .await?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Delete a vendor's store and, by cascade, its products.
    ///
    /// Returns the image paths of the deleted products so the files can be
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store does not exist or
    /// belongs to another vendor.
    pub async fn delete(
        &self,
        id: StoreId,
        vendor_id: UserId,
    ) -> Result<Vec<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let images: Vec<String> = sqlx::query_scalar(
            r"
            SELECT p.image_path
            FROM bazaar.product p
            JOIN bazaar.store s ON s.id = p.store_id
            WHERE s.id = $1 AND s.vendor_id = $2 AND p.image_path IS NOT NULL
            ",
        )
        .bind(id)
        .bind(vendor_id)
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM bazaar.store WHERE id = $1 AND vendor_id = $2")
            .bind(id)
            .bind(vendor_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(images)
    }
}
