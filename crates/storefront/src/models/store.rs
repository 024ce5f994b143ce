//! Store domain type.

use chrono::{DateTime, Utc};

use bazaar_core::{StoreId, UserId};

/// A vendor-owned shop grouping products.
#[derive(Debug, Clone)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub description: String,
    /// Owning vendor.
    pub vendor_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
