//! Bazaar storefront library.
//!
//! A multi-vendor marketplace: vendors run stores and list products,
//! buyers browse, fill a session cart, check out and leave reviews. Pages
//! are rendered on the server with Askama.
//!
//! The binary in `main.rs` wires configuration and logging around [`app`];
//! integration tests serve [`build_app`] on an ephemeral port.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod flash;
pub mod forms;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header::CACHE_CONTROL},
    middleware as axum_middleware,
    routing::get,
};
use sqlx::migrate::Migrator;
use tower::Layer;
use tower_http::{
    normalize_path::{NormalizePath, NormalizePathLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::state::AppState;

/// Embedded schema migrations, run by `bazaar-cli migrate`.
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Cache lifetime for files under `/static`.
const STATIC_CACHE_CONTROL: &str = "public, max-age=3600";

/// Build the full application with rate limiting on the auth routes.
#[must_use]
pub fn app(state: AppState) -> NormalizePath<Router> {
    build_app(state, true)
}

/// Build the application router.
///
/// Trailing slashes are trimmed before routing, so `/login/` and `/login`
/// reach the same handler. `rate_limit_auth` switches the per-IP limiter on
/// the login, registration and password reset routes.
#[must_use]
pub fn build_app(state: AppState, rate_limit_auth: bool) -> NormalizePath<Router> {
    let config = state.config();
    let session_layer = middleware::create_session_layer(state.pool(), config);

    let static_files = Router::new()
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static(STATIC_CACHE_CONTROL),
        ));

    let router = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes(rate_limit_auth))
        .layer(session_layer)
        .nest_service("/static", static_files)
        .nest_service("/media", ServeDir::new(state.media().root()))
        .layer(axum_middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
