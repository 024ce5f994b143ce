//! Order repository.
//!
//! Placing an order is the only multi-statement write in the storefront: the
//! order row, its items, and the stock decrements commit together or not at
//! all. The decrement is guarded (`stock_quantity >= quantity`) so two buyers
//! racing for the last unit cannot both succeed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use bazaar_core::{Money, OrderId, OrderItemId, ProductId, UserId};

use super::RepositoryError;
use crate::models::{Order, OrderItem, OrderLine};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    buyer_id: UserId,
    total_amount: Decimal,
    invoice_sent: bool,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            buyer_id: row.buyer_id,
            total_amount: Money::new(row.total_amount),
            invoice_sent: row.invoice_sent,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    product_name: String,
    quantity: i32,
    price: Decimal,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "invalid quantity {} on order item {}",
                row.quantity, row.id
            ))
        })?;

        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity,
            price: Money::new(row.price),
        })
    }
}

/// Errors from [`OrderRepository::place_order`].
#[derive(Debug, thiserror::Error)]
pub enum PlaceOrderError {
    /// Stock ran out for this product between validation and commit.
    #[error("insufficient stock for product {0}")]
    InsufficientStock(ProductId),

    /// Repository/database error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for PlaceOrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an order with its items and decrement stock, atomically.
    ///
    /// # Errors
    ///
    /// Returns `PlaceOrderError::InsufficientStock` if a product no longer
    /// has enough units (nothing is written).
    /// Returns `PlaceOrderError::Repository` for database errors.
    pub async fn place_order(
        &self,
        buyer_id: UserId,
        lines: &[OrderLine],
        total: Money,
    ) -> Result<Order, PlaceOrderError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO bazaar.order (buyer_id, total_amount)
            VALUES ($1, $2)
            RETURNING id, buyer_id, total_amount, invoice_sent, created_at
            ",
        )
        .bind(buyer_id)
        .bind(total.amount())
        .fetch_one(&mut *tx)
        .await?;

        for line in lines {
            let quantity = i32::try_from(line.quantity)
                .map_err(|_| PlaceOrderError::InsufficientStock(line.product_id))?;

            let decremented = sqlx::query(
                r"
                UPDATE bazaar.product
                SET stock_quantity = stock_quantity - $2, updated_at = NOW()
                WHERE id = $1 AND stock_quantity >= $2
                ",
            )
            .bind(line.product_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

            if decremented.rows_affected() == 0 {
                // Dropping the transaction rolls it back.
                return Err(PlaceOrderError::InsufficientStock(line.product_id));
            }

            sqlx::query(
                r"
                INSERT INTO bazaar.order_item (order_id, product_id, quantity, price)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(order.id)
            .bind(line.product_id)
            .bind(quantity)
            .bind(line.price.amount())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(order.into())
    }

    /// A buyer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_buyer(&self, buyer_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, buyer_id, total_amount, invoice_sent, created_at
            FROM bazaar.order
            WHERE buyer_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(buyer_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get an order only if it belongs to `buyer_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_buyer(
        &self,
        id: OrderId,
        buyer_id: UserId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, buyer_id, total_amount, invoice_sent, created_at
            FROM bazaar.order
            WHERE id = $1 AND buyer_id = $2
            ",
        )
        .bind(id)
        .bind(buyer_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Items of an order with their product names.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT i.id, i.order_id, i.product_id, p.name AS product_name, i.quantity, i.price
            FROM bazaar.order_item i
            JOIN bazaar.product p ON p.id = i.product_id
            WHERE i.order_id = $1
            ORDER BY i.id
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Record that the invoice email went out.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_invoice_sent(&self, id: OrderId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE bazaar.order SET invoice_sent = TRUE WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Whether `buyer_id` has ever ordered `product_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_purchased(
        &self,
        buyer_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let purchased: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS(
                SELECT 1
                FROM bazaar.order_item i
                JOIN bazaar.order o ON o.id = i.order_id
                WHERE o.buyer_id = $1 AND i.product_id = $2
            )
            ",
        )
        .bind(buyer_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        Ok(purchased)
    }
}
