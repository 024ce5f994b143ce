//! Business logic services for the storefront.
//!
//! - `auth` - Password accounts and reset tokens
//! - `cart` - Session cart arithmetic and stock checks
//! - `checkout` - Turning a cart into order lines
//! - `email` - Invoice and password reset emails
//! - `media` - Product image storage

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod email;
pub mod media;

pub use auth::{AuthError, AuthService};
pub use cart::{Cart, CartError, CartLine};
pub use checkout::{CheckoutPlan, CheckoutProblem, plan_checkout};
pub use email::{EmailError, EmailService, Outbox, SentEmail};
pub use media::{MediaError, MediaStorage};
