//! Order domain types.

use chrono::{DateTime, Utc};

use bazaar_core::{Money, OrderId, OrderItemId, ProductId, UserId};

/// A placed order.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: UserId,
    /// Sum of line totals at the time of purchase.
    pub total_amount: Money,
    /// Whether the invoice email went out.
    pub invoice_sent: bool,
    pub created_at: DateTime<Utc>,
}

/// One line of a placed order.
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    /// Unit price when the order was placed.
    pub price: Money,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

/// A line to be written when placing an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price: Money,
}

impl OrderLine {
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}
