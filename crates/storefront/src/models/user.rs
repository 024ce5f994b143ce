//! User domain types.

use chrono::{DateTime, Utc};

use bazaar_core::{Email, Role, UserId};

/// A storefront account, either a vendor or a buyer.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Contact address, unique across accounts.
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    /// What the account may do.
    pub role: Role,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Full name when set, otherwise the username.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_owned()
        }
    }
}
