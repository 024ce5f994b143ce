//! Back-office listing and deletion across every table.
//!
//! Used by `bazaar-cli admin`. Rows come back as an id plus a one-line
//! summary assembled in SQL, so every entity prints the same way.

use std::fmt;
use std::str::FromStr;

use sqlx::PgPool;

use super::RepositoryError;

/// A table an operator can inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Store,
    Product,
    Order,
    OrderItem,
    Review,
    ResetToken,
}

impl Entity {
    pub const ALL: [Self; 7] = [
        Self::User,
        Self::Store,
        Self::Product,
        Self::Order,
        Self::OrderItem,
        Self::Review,
        Self::ResetToken,
    ];

    /// Command-line name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Store => "stores",
            Self::Product => "products",
            Self::Order => "orders",
            Self::OrderItem => "order-items",
            Self::Review => "reviews",
            Self::ResetToken => "reset-tokens",
        }
    }

    const fn table(self) -> &'static str {
        match self {
            Self::User => "bazaar.user",
            Self::Store => "bazaar.store",
            Self::Product => "bazaar.product",
            Self::Order => "bazaar.order",
            Self::OrderItem => "bazaar.order_item",
            Self::Review => "bazaar.review",
            Self::ResetToken => "bazaar.password_reset_token",
        }
    }

    /// Listing query: `id` and `summary`, newest first, `$1` rows.
    const fn list_sql(self) -> &'static str {
        match self {
            Self::User => {
                r"SELECT u.id, format('%s <%s> %s, joined %s', u.username, u.email, u.role,
                        to_char(u.created_at, 'YYYY-MM-DD')) AS summary
                  FROM bazaar.user u
                  ORDER BY u.id DESC LIMIT $1"
            }
            Self::Store => {
                r"SELECT s.id, format('%s by %s, %s products', s.name, u.username,
                        (SELECT COUNT(*) FROM bazaar.product p WHERE p.store_id = s.id)) AS summary
                  FROM bazaar.store s
                  JOIN bazaar.user u ON u.id = s.vendor_id
                  ORDER BY s.id DESC LIMIT $1"
            }
            Self::Product => {
                r"SELECT p.id, format('%s in %s, $%s, %s in stock', p.name, s.name, p.price,
                        p.stock_quantity) AS summary
                  FROM bazaar.product p
                  JOIN bazaar.store s ON s.id = p.store_id
                  ORDER BY p.id DESC LIMIT $1"
            }
            Self::Order => {
                r"SELECT o.id, format('%s, $%s, %s, invoice %s', u.username, o.total_amount,
                        to_char(o.created_at, 'YYYY-MM-DD HH24:MI'),
                        CASE WHEN o.invoice_sent THEN 'sent' ELSE 'not sent' END) AS summary
                  FROM bazaar.order o
                  JOIN bazaar.user u ON u.id = o.buyer_id
                  ORDER BY o.id DESC LIMIT $1"
            }
            Self::OrderItem => {
                r"SELECT i.id, format('order #%s: %s x%s @ $%s', i.order_id, p.name, i.quantity,
                        i.price) AS summary
                  FROM bazaar.order_item i
                  JOIN bazaar.product p ON p.id = i.product_id
                  ORDER BY i.id DESC LIMIT $1"
            }
            Self::Review => {
                r"SELECT r.id, format('%s on %s: %s/5%s', u.username, p.name, r.rating,
                        CASE WHEN r.is_verified THEN ', verified' ELSE '' END) AS summary
                  FROM bazaar.review r
                  JOIN bazaar.user u ON u.id = r.user_id
                  JOIN bazaar.product p ON p.id = r.product_id
                  ORDER BY r.id DESC LIMIT $1"
            }
            Self::ResetToken => {
                r"SELECT t.id, format('%s, expires %s%s', u.username,
                        to_char(t.expires_at, 'YYYY-MM-DD HH24:MI'),
                        CASE WHEN t.used THEN ', used' ELSE '' END) AS summary
                  FROM bazaar.password_reset_token t
                  JOIN bazaar.user u ON u.id = t.user_id
                  ORDER BY t.id DESC LIMIT $1"
            }
        }
    }

    /// Images of products removed along with a row of this entity.
    const fn cascaded_images_sql(self) -> Option<&'static str> {
        match self {
            Self::User => Some(
                r"SELECT p.image_path FROM bazaar.product p
                  JOIN bazaar.store s ON s.id = p.store_id
                  WHERE s.vendor_id = $1 AND p.image_path IS NOT NULL",
            ),
            Self::Store => Some(
                r"SELECT image_path FROM bazaar.product
                  WHERE store_id = $1 AND image_path IS NOT NULL",
            ),
            Self::Product => Some(
                r"SELECT image_path FROM bazaar.product
                  WHERE id = $1 AND image_path IS NOT NULL",
            ),
            Self::Order | Self::OrderItem | Self::Review | Self::ResetToken => None,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown entity name.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown entity '{0}'; expected one of: users, stores, products, orders, order-items, reviews, reset-tokens")]
pub struct UnknownEntity(String);

impl FromStr for Entity {
    type Err = UnknownEntity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|entity| entity.name() == wanted)
            .ok_or_else(|| UnknownEntity(s.to_owned()))
    }
}

/// One listed row.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AdminRow {
    pub id: i32,
    pub summary: String,
}

impl fmt::Display for AdminRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:<6} {}", self.id, self.summary)
    }
}

/// Result of a deletion.
#[derive(Debug, Default)]
pub struct Deleted {
    /// Media paths of product images whose rows are gone.
    pub image_paths: Vec<String>,
}

/// Repository for back-office operations.
pub struct AdminRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The newest `limit` rows of `entity`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, entity: Entity, limit: i64) -> Result<Vec<AdminRow>, RepositoryError> {
        Ok(sqlx::query_as::<_, AdminRow>(entity.list_sql())
            .bind(limit)
            .fetch_all(self.pool)
            .await?)
    }

    /// Delete one row; dependent rows go with it through `ON DELETE CASCADE`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row has that id.
    pub async fn delete(&self, entity: Entity, id: i32) -> Result<Deleted, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let image_paths = match entity.cascaded_images_sql() {
            Some(sql) => {
                sqlx::query_scalar::<_, String>(sql)
                    .bind(id)
                    .fetch_all(&mut *tx)
                    .await?
            }
            None => Vec::new(),
        };

        let sql = format!("DELETE FROM {} WHERE id = $1", entity.table());
        let result = sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        tracing::info!(%entity, id, images = image_paths.len(), "Admin delete");
        Ok(Deleted { image_paths })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_names_parse() {
        for entity in Entity::ALL {
            assert_eq!(entity.name().parse::<Entity>().unwrap(), entity);
        }
        assert_eq!("Order_Items".parse::<Entity>().unwrap(), Entity::OrderItem);
        assert!("carts".parse::<Entity>().is_err());
    }

    #[test]
    fn test_only_catalog_deletes_touch_images() {
        assert!(Entity::User.cascaded_images_sql().is_some());
        assert!(Entity::Store.cascaded_images_sql().is_some());
        assert!(Entity::Product.cascaded_images_sql().is_some());
        assert!(Entity::Order.cascaded_images_sql().is_none());
        assert!(Entity::Review.cascaded_images_sql().is_none());
    }

    #[test]
    fn test_list_queries_return_id_and_summary() {
        for entity in Entity::ALL {
            let sql = entity.list_sql();
            assert!(sql.contains("AS summary"), "{entity}");
            assert!(sql.contains("LIMIT $1"), "{entity}");
        }
    }

    #[test]
    fn test_row_display() {
        let row = AdminRow {
            id: 12,
            summary: "ada <ada@example.com> vendor".to_owned(),
        };
        assert_eq!(row.to_string(), "#12     ada <ada@example.com> vendor");
    }
}
