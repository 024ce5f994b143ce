//! Core types for Bazaar.
//!
//! Type-safe wrappers for the storefront's domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod rating;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{Money, MoneyError};
pub use rating::{Rating, RatingError};
pub use role::{Role, RoleParseError};
