//! Product domain types.

use chrono::{DateTime, Utc};

use bazaar_core::{Money, ProductId, StoreId};

/// Shown when a product has no uploaded image.
pub const PLACEHOLDER_IMAGE_URL: &str = "/static/images/placeholder-product.svg";

/// An item for sale in a store.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Current unit price.
    pub price: Money,
    /// Units available; never negative.
    pub stock_quantity: u32,
    /// Image path relative to the media root.
    pub image_path: Option<String>,
    pub store_id: StoreId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether at least one unit can be bought.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    /// URL of the product image, or the placeholder.
    #[must_use]
    pub fn image_url(&self) -> String {
        self.image_path.as_ref().map_or_else(
            || PLACEHOLDER_IMAGE_URL.to_owned(),
            |path| format!("/media/{path}"),
        )
    }
}

/// A product together with the name of the store selling it.
#[derive(Debug, Clone)]
pub struct ProductWithStore {
    pub product: Product,
    pub store_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: u32, image: Option<&str>) -> Product {
        Product {
            id: ProductId::new(1),
            name: "Teapot".to_owned(),
            description: "Short and stout".to_owned(),
            price: Money::parse("12.00").expect("valid price"),
            stock_quantity: stock,
            image_path: image.map(str::to_owned),
            store_id: StoreId::new(1),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_in_stock() {
        assert!(product(1, None).in_stock());
        assert!(!product(0, None).in_stock());
    }

    #[test]
    fn test_image_url_falls_back_to_placeholder() {
        assert_eq!(product(1, None).image_url(), PLACEHOLDER_IMAGE_URL);
        assert_eq!(
            product(1, Some("products/abc.png")).image_url(),
            "/media/products/abc.png"
        );
    }
}
