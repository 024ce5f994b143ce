//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                  - Home page
//! GET  /product/{id}                      - Product detail
//! GET  /product/{id}/review               - Review form (buyer)
//! POST /product/{id}/review               - Save review (buyer)
//!
//! # Auth (rate limited)
//! GET|POST /login                         - Login
//! GET|POST /logout                        - Logout
//! GET|POST /register/vendor               - Vendor registration
//! GET|POST /register/buyer                - Buyer registration
//! GET|POST /password-reset                - Request a reset link
//! GET|POST /password-reset-confirm/{token} - Set a new password
//!
//! # Vendor
//! GET  /vendor/dashboard                  - Dashboard
//! GET  /vendor/stores                     - Store list
//! GET|POST /vendor/stores/create          - Create store
//! GET|POST /vendor/stores/{id}/edit       - Edit store
//! GET|POST /vendor/stores/{id}/delete     - Confirm / delete store
//! GET  /vendor/products                   - Product list
//! GET|POST /vendor/products/create        - Create product (multipart)
//! GET|POST /vendor/products/{id}/edit     - Edit product (multipart)
//! GET|POST /vendor/products/{id}/delete   - Confirm / delete product
//!
//! # Buyer
//! GET  /cart                              - Cart
//! POST /cart/add/{id}                     - Add one unit
//! POST /cart/update/{id}                  - Set quantity
//! POST /cart/remove/{id}                  - Remove line
//! POST /checkout                          - Place order
//! GET  /order/{id}                        - Order detail
//! GET  /account/orders                    - Order history
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod orders;
pub mod page;
pub mod products;
pub mod reviews;
pub mod vendor;

pub use page::PageContext;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRequestParts, Path},
    routing::{get, post},
};

use crate::error::AppError;
use crate::middleware::auth_rate_limiter;
use crate::services::media::MAX_IMAGE_BYTES;
use crate::state::AppState;

/// Record id from the URL path. A segment that is not a valid id is a 404.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct IdPath<T>(pub T);

/// Request body limit for product forms. It sits well above the image cap so
/// an oversized file is read and reported as a field error.
const PRODUCT_FORM_BODY_LIMIT: usize = 4 * MAX_IMAGE_BYTES;

/// Login, registration and password reset routes.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route(
            "/register/vendor",
            get(auth::register_vendor_page).post(auth::register_vendor),
        )
        .route(
            "/register/buyer",
            get(auth::register_buyer_page).post(auth::register_buyer),
        )
        .route(
            "/password-reset",
            get(auth::password_reset_page).post(auth::password_reset),
        )
        .route(
            "/password-reset-confirm/{token}",
            get(auth::password_reset_confirm_page).post(auth::password_reset_confirm),
        )
}

/// Vendor store and product management routes.
pub fn vendor_routes() -> Router<AppState> {
    let product_forms = Router::new()
        .route(
            "/products/create",
            get(vendor::products::new).post(vendor::products::create),
        )
        .route(
            "/products/{id}/edit",
            get(vendor::products::edit).post(vendor::products::update),
        )
        .layer(DefaultBodyLimit::max(PRODUCT_FORM_BODY_LIMIT));

    Router::new()
        .route("/dashboard", get(vendor::dashboard))
        .route("/stores", get(vendor::stores::index))
        .route(
            "/stores/create",
            get(vendor::stores::new).post(vendor::stores::create),
        )
        .route(
            "/stores/{id}/edit",
            get(vendor::stores::edit).post(vendor::stores::update),
        )
        .route(
            "/stores/{id}/delete",
            get(vendor::stores::confirm_delete).post(vendor::stores::delete),
        )
        .route("/products", get(vendor::products::index))
        .route(
            "/products/{id}/delete",
            get(vendor::products::confirm_delete).post(vendor::products::delete),
        )
        .merge(product_forms)
}

/// Cart routes.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add/{id}", post(cart::add))
        .route("/update/{id}", post(cart::update))
        .route("/remove/{id}", post(cart::remove))
}

/// Create all routes for the storefront.
///
/// `rate_limit` applies the per-IP limiter to the auth routes.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    let auth = if rate_limit {
        auth_routes().layer(auth_rate_limiter())
    } else {
        auth_routes()
    };

    Router::new()
        .route("/", get(home::home))
        .route("/logout", get(auth::logout).post(auth::logout))
        .merge(auth)
        .route("/product/{id}", get(products::show))
        .route(
            "/product/{id}/review",
            get(reviews::edit).post(reviews::submit),
        )
        .nest("/vendor", vendor_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", post(checkout::checkout))
        .route("/order/{id}", get(orders::show))
        .route("/account/orders", get(orders::index))
}
