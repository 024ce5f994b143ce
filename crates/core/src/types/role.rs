//! Account roles.

use serde::{Deserialize, Serialize};

/// Error returned when a role string is not recognised.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid role: {0}")]
pub struct RoleParseError(pub String);

/// What an account is allowed to do on the storefront.
///
/// Stored as lowercase text (`vendor`, `buyer`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Seller account that owns stores and products.
    Vendor,
    /// Purchaser account that carries a cart and places orders.
    #[default]
    Buyer,
}

impl Role {
    /// The stored text form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Vendor => "vendor",
            Self::Buyer => "buyer",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Vendor => "Vendor",
            Self::Buyer => "Buyer",
        }
    }

    #[must_use]
    pub const fn is_vendor(&self) -> bool {
        matches!(self, Self::Vendor)
    }

    #[must_use]
    pub const fn is_buyer(&self) -> bool {
        matches!(self, Self::Buyer)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vendor" => Ok(Self::Vendor),
            "buyer" => Ok(Self::Buyer),
            _ => Err(RoleParseError(s.to_owned())),
        }
    }
}
