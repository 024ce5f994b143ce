//! Product repository.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use bazaar_core::{Money, ProductId, StoreId, UserId};

use super::RepositoryError;
use crate::models::{Product, ProductWithStore};

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.description, p.price, p.stock_quantity, \
     p.image_path, p.store_id, p.created_at, p.updated_at";

/// Internal row type for database queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    price: Decimal,
    stock_quantity: i32,
    image_path: Option<String>,
    store_id: StoreId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let stock_quantity = u32::try_from(row.stock_quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "negative stock {} for product {}",
                row.stock_quantity, row.id
            ))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: Money::new(row.price),
            stock_quantity,
            image_path: row.image_path,
            store_id: row.store_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductWithStoreRow {
    #[sqlx(flatten)]
    product: ProductRow,
    store_name: String,
}

impl TryFrom<ProductWithStoreRow> for ProductWithStore {
    type Error = RepositoryError;

    fn try_from(row: ProductWithStoreRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product: row.product.try_into()?,
            store_name: row.store_name,
        })
    }
}

/// Editable product fields, shared by create and update.
#[derive(Debug, Clone)]
pub struct ProductFields {
    pub store_id: StoreId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock_quantity: u32,
    /// Image path relative to the media root.
    pub image_path: Option<String>,
}

/// Converts a stock count for an `INTEGER` column.
fn stock_param(stock: u32) -> Result<i32, RepositoryError> {
    i32::try_from(stock)
        .map_err(|_| RepositoryError::Conflict(format!("stock quantity {stock} is too large")))
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Products with stock available, newest first, with their store names.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_in_stock(&self) -> Result<Vec<ProductWithStore>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductWithStoreRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}, s.name AS store_name
            FROM bazaar.product p
            JOIN bazaar.store s ON s.id = p.store_id
            WHERE p.stock_quantity > 0
            ORDER BY p.created_at DESC, p.id DESC
            "
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Every product across a vendor's stores, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_vendor(
        &self,
        vendor_id: UserId,
    ) -> Result<Vec<ProductWithStore>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductWithStoreRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}, s.name AS store_name
            FROM bazaar.product p
            JOIN bazaar.store s ON s.id = p.store_id
            WHERE s.vendor_id = $1
            ORDER BY p.created_at DESC, p.id DESC
            "
        ))
        .bind(vendor_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Number of products across a vendor's stores.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_for_vendor(&self, vendor_id: UserId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM bazaar.product p
            JOIN bazaar.store s ON s.id = p.store_id
            WHERE s.vendor_id = $1
            ",
        )
        .bind(vendor_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM bazaar.product p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Load several products at once, keyed by ID. Missing IDs are absent
    /// from the map.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let raw_ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM bazaar.product p WHERE p.id = ANY($1)"
        ))
        .bind(raw_ids)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Product::try_from(row).map(|p| (p.id, p)))
            .collect()
    }

    /// Get a product only if it sits in one of `vendor_id`'s stores.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_vendor(
        &self,
        id: ProductId,
        vendor_id: UserId,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM bazaar.product p
            JOIN bazaar.store s ON s.id = p.store_id
            WHERE p.id = $1 AND s.vendor_id = $2
            "
        ))
        .bind(id)
        .bind(vendor_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a product. The caller has already checked store ownership.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, fields: &ProductFields) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO bazaar.product AS p
                (name, description, price, stock_quantity, image_path, store_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.price.amount())
        .bind(stock_param(fields.stock_quantity)?)
        .bind(fields.image_path.as_deref())
        .bind(fields.store_id)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Update a product in one of `vendor_id`'s stores. The target store
    /// must also belong to the vendor.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not the vendor's.
    pub async fn update(
        &self,
        id: ProductId,
        vendor_id: UserId,
        fields: &ProductFields,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE bazaar.product AS p
            SET name = $3, description = $4, price = $5, stock_quantity = $6,
                image_path = $7, store_id = $8, updated_at = NOW()
            FROM bazaar.store s
            WHERE p.id = $1
              AND s.id = p.store_id
              AND s.vendor_id = $2
              AND EXISTS (SELECT 1 FROM bazaar.store t WHERE t.id = $8 AND t.vendor_id = $2)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(vendor_id)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.price.amount())
        .bind(stock_param(fields.stock_quantity)?)
        .bind(fields.image_path.as_deref())
        .bind(fields.store_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into)
            .transpose()?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product in one of `vendor_id`'s stores.
    ///
    /// Returns the removed product's image path, if it had one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not the vendor's.
    pub async fn delete(
        &self,
        id: ProductId,
        vendor_id: UserId,
    ) -> Result<Option<String>, RepositoryError> {
        let deleted: Option<Option<String>> = sqlx::query_scalar(
            r"
            DELETE FROM bazaar.product AS p
            USING bazaar.store s
            WHERE p.id = $1 AND s.id = p.store_id AND s.vendor_id = $2
            RETURNING p.image_path
            ",
        )
        .bind(id)
        .bind(vendor_id)
        .fetch_optional(self.pool)
        .await?;

        deleted.ok_or(RepositoryError::NotFound)
    }
}
