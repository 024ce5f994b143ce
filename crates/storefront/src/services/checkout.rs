//! Checkout planning.
//!
//! Turns a session cart into order lines priced at current product prices,
//! or into the list of problems that block the order. Nothing is written
//! here; see [`crate::db::OrderRepository::place_order`] for the
//! transactional part.

use std::collections::HashMap;

use bazaar_core::{Money, ProductId};

use super::cart::Cart;
use crate::models::{OrderLine, Product};

/// A cart line that cannot be ordered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutProblem {
    #[error("Product with ID {0} no longer exists.")]
    Missing(ProductId),

    #[error("{name} is out of stock.")]
    OutOfStock { name: String },

    #[error("Only {available} {name} available.")]
    Insufficient { name: String, available: u32 },
}

/// Lines and total for an order that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPlan {
    pub lines: Vec<OrderLine>,
    pub total: Money,
}

/// Check every cart line against current stock and price the order.
///
/// # Errors
///
/// Returns every [`CheckoutProblem`] found, in cart order, when at least one
/// line cannot be fulfilled.
pub fn plan_checkout(
    cart: &Cart,
    products: &HashMap<ProductId, Product>,
) -> Result<CheckoutPlan, Vec<CheckoutProblem>> {
    let mut lines = Vec::new();
    let mut problems = Vec::new();

    for (product_id, quantity) in cart.lines() {
        let Some(product) = products.get(&product_id) else {
            problems.push(CheckoutProblem::Missing(product_id));
            continue;
        };

        if !product.in_stock() {
            problems.push(CheckoutProblem::OutOfStock {
                name: product.name.clone(),
            });
            continue;
        }
        if quantity > product.stock_quantity {
            problems.push(CheckoutProblem::Insufficient {
                name: product.name.clone(),
                available: product.stock_quantity,
            });
            continue;
        }

        lines.push(OrderLine {
            product_id,
            product_name: product.name.clone(),
            quantity,
            price: product.price,
        });
    }

    if !problems.is_empty() {
        return Err(problems);
    }

    let total = lines.iter().map(OrderLine::line_total).sum();
    Ok(CheckoutPlan { lines, total })
}
