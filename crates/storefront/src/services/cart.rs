//! Session cart.
//!
//! The cart maps product ids to quantities and lives in the buyer's session
//! under [`session_keys::CART`]. Stock is checked when lines are added or
//! changed, and again at checkout.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use bazaar_core::{Money, ProductId};

use crate::models::{Product, session_keys};

/// Why a cart change was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("Product is out of stock.")]
    OutOfStock,

    /// Adding one more unit would exceed stock.
    #[error("Only {available} items available in stock.")]
    ExceedsStock { available: u32 },

    /// The requested quantity exceeds stock.
    #[error("Only {available} items available.")]
    QuantityExceedsStock { available: u32 },
}

/// Result of setting a line's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    Removed,
    Updated(u32),
}

/// A priced cart line for display.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
    pub line_total: Money,
}

/// Product quantities keyed by product id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: BTreeMap<ProductId, u32>,
}

impl Cart {
    /// Load the cart from the session. A missing or unreadable cart is empty.
    pub async fn load(session: &Session) -> Self {
        match session.get::<Self>(session_keys::CART).await {
            Ok(cart) => cart.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cart from session");
                Self::default()
            }
        }
    }

    /// Persist the cart to the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn save(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.insert(session_keys::CART, self).await
    }

    /// Empty the session cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn clear(session: &Session) -> Result<(), tower_sessions::session::Error> {
        Self::default().save(session).await
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.lines.values().sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Quantity held for a product, zero when absent.
    #[must_use]
    pub fn quantity(&self, product_id: ProductId) -> u32 {
        self.lines.get(&product_id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.lines.keys().copied().collect()
    }

    /// Lines in product id order.
    pub fn lines(&self) -> impl Iterator<Item = (ProductId, u32)> + '_ {
        self.lines.iter().map(|(id, qty)| (*id, *qty))
    }

    /// Add one unit of `product`.
    ///
    /// Returns the new quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartError::OutOfStock` if the product has no stock and
    /// `CartError::ExceedsStock` if the cart already holds every unit.
    pub fn add(&mut self, product: &Product) -> Result<u32, CartError> {
        if !product.in_stock() {
            return Err(CartError::OutOfStock);
        }

        let quantity = self.quantity(product.id).saturating_add(1);
        if quantity > product.stock_quantity {
            return Err(CartError::ExceedsStock {
                available: product.stock_quantity,
            });
        }

        self.lines.insert(product.id, quantity);
        Ok(quantity)
    }

    /// Set the quantity for `product`. Zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::QuantityExceedsStock` if `quantity` is more than
    /// the product's stock; the cart is unchanged.
    pub fn set_quantity(
        &mut self,
        product: &Product,
        quantity: i64,
    ) -> Result<QuantityChange, CartError> {
        if quantity <= 0 {
            self.lines.remove(&product.id);
            return Ok(QuantityChange::Removed);
        }

        match u32::try_from(quantity) {
            Ok(quantity) if quantity <= product.stock_quantity => {
                self.lines.insert(product.id, quantity);
                Ok(QuantityChange::Updated(quantity))
            }
            _ => Err(CartError::QuantityExceedsStock {
                available: product.stock_quantity,
            }),
        }
    }

    /// Remove a line. Returns whether it was present.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        self.lines.remove(&product_id).is_some()
    }

    /// Drop lines whose product no longer exists or is out of stock.
    ///
    /// Returns whether anything was removed.
    pub fn prune(&mut self, products: &HashMap<ProductId, Product>) -> bool {
        let before = self.lines.len();
        self.lines
            .retain(|id, _| products.get(id).is_some_and(Product::in_stock));
        self.lines.len() != before
    }

    /// Price each line against current products. Lines without a product
    /// are skipped.
    #[must_use]
    pub fn priced_lines(&self, products: &HashMap<ProductId, Product>) -> Vec<CartLine> {
        self.lines()
            .filter_map(|(id, quantity)| {
                products.get(&id).map(|product| CartLine {
                    product: product.clone(),
                    quantity,
                    line_total: product.price.times(quantity),
                })
            })
            .collect()
    }
}

/// Sum of line totals.
#[must_use]
pub fn cart_total(lines: &[CartLine]) -> Money {
    lines.iter().map(|line| line.line_total).sum()
}
