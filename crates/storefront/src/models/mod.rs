//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`].

pub mod order;
pub mod product;
pub mod reset_token;
pub mod review;
pub mod session;
pub mod store;
pub mod user;

pub use order::{Order, OrderItem, OrderLine};
pub use product::{Product, ProductWithStore};
pub use reset_token::PasswordResetToken;
pub use review::{Review, ReviewWithAuthor};
pub use session::{CurrentUser, keys as session_keys};
pub use store::Store;
pub use user::User;
