//! Review domain types.

use chrono::{DateTime, Utc};

use bazaar_core::{ProductId, Rating, ReviewId, UserId};

/// A buyer's review of a product. At most one per buyer and product.
#[derive(Debug, Clone)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: Rating,
    pub comment: String,
    /// The author bought the product.
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// A review with its author's username, for product pages.
#[derive(Debug, Clone)]
pub struct ReviewWithAuthor {
    pub review: Review,
    pub username: String,
}
