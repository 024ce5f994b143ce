//! Bazaar Core - Shared domain types.
//!
//! Used by every Bazaar component:
//! - `storefront` - The multi-vendor storefront web application
//! - `cli` - Command-line tools for migrations and account management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP. Database encodings are gated behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, money, emails, roles and ratings

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
