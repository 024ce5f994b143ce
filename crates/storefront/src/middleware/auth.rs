//! Authentication and role extractors.
//!
//! Handlers declare what they need in their signature:
//!
//! ```rust,ignore
//! async fn dashboard(RequireVendor(vendor): RequireVendor) -> impl IntoResponse {
//!     format!("Hello, {}!", vendor.username)
//! }
//! ```
//!
//! Anonymous visitors are sent to the login page with a `next` parameter;
//! logged-in users with the wrong role are sent home with a flash message.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use bazaar_core::Role;
use tower_sessions::Session;

use crate::flash::{self, FlashMessage};
use crate::models::{CurrentUser, session_keys};

/// Redirect produced when a request lacks the required identity.
#[derive(Debug)]
pub enum AuthRejection {
    /// Not logged in; carries the path to return to.
    RedirectToLogin(String),
    /// Logged in with the wrong role.
    RedirectHome,
    /// No session layer is installed.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(next) => Redirect::to(&login_url(&next)).into_response(),
            Self::RedirectHome => Redirect::to("/").into_response(),
            Self::MissingSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// Login page URL that returns to `next` afterwards.
#[must_use]
pub fn login_url(next: &str) -> String {
    format!("/login?next={}", urlencoding::encode(next))
}

/// Whether `next` is a path on this site, safe to redirect to after login.
#[must_use]
pub fn is_safe_next(next: &str) -> bool {
    next.starts_with('/') && !next.starts_with("//") && !next.contains('\\')
}

fn session_of(parts: &Parts) -> Result<Session, AuthRejection> {
    parts
        .extensions
        .get::<Session>()
        .cloned()
        .ok_or(AuthRejection::MissingSession)
}

/// Full path and query of the request, including any prefix stripped by
/// `Router::nest`.
fn requested_path(parts: &Parts) -> String {
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |OriginalUri(uri)| uri);
    uri.path_and_query()
        .map_or_else(|| uri.path().to_owned(), |pq| pq.as_str().to_owned())
}

/// The logged-in user stored in `session`, if any.
pub async fn current_user(session: &Session) -> Option<CurrentUser> {
    match session.get::<CurrentUser>(session_keys::CURRENT_USER).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read current user from session");
            None
        }
    }
}

async fn require_role(
    parts: &Parts,
    role: Role,
    denied: &'static str,
) -> Result<CurrentUser, AuthRejection> {
    let session = session_of(parts)?;
    let user = current_user(&session)
        .await
        .ok_or_else(|| AuthRejection::RedirectToLogin(requested_path(parts)))?;
    if user.role == role {
        Ok(user)
    } else {
        flash::push(&session, FlashMessage::error(denied)).await;
        Err(AuthRejection::RedirectHome)
    }
}

/// Extractor that requires a logged-in vendor.
pub struct RequireVendor(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireVendor
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_role(
            parts,
            Role::Vendor,
            "Access denied. Vendor access required.",
        )
        .await
        .map(Self)
    }
}

/// Extractor that requires a logged-in buyer.
pub struct RequireBuyer(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireBuyer
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, Role::Buyer, "Access denied. Buyer access required.")
            .await
            .map(Self)
    }
}

/// Log a user in: cycle the session id and store their identity.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Log out: drop every session value, including the cart.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request, routing::get};
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;

    async fn vendor_only(RequireVendor(_): RequireVendor) -> &'static str {
        "ok"
    }

    async fn location_for(app: Router, uri: &str) -> Option<String> {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    }

    #[tokio::test]
    async fn test_nested_route_keeps_full_path_in_next() {
        let app = Router::new()
            .nest(
                "/vendor",
                Router::new().route("/dashboard", get(vendor_only)),
            )
            .route("/top", get(vendor_only))
            .layer(SessionManagerLayer::new(MemoryStore::default()));

        assert_eq!(
            location_for(app.clone(), "/vendor/dashboard?tab=2").await.as_deref(),
            Some("/login?next=%2Fvendor%2Fdashboard%3Ftab%3D2")
        );
        assert_eq!(
            location_for(app, "/top").await.as_deref(),
            Some("/login?next=%2Ftop")
        );
    }

    #[test]
    fn test_login_url_encodes_next() {
        assert_eq!(login_url("/cart"), "/login?next=%2Fcart");
        assert_eq!(
            login_url("/product/3/review?x=1"),
            "/login?next=%2Fproduct%2F3%2Freview%3Fx%3D1"
        );
    }

    #[test]
    fn test_is_safe_next() {
        assert!(is_safe_next("/vendor/dashboard"));
        assert!(!is_safe_next("//evil.example"));
        assert!(!is_safe_next("https://evil.example"));
        assert!(!is_safe_next("/\\evil.example"));
        assert!(!is_safe_next(""));
    }

    #[test]
    fn test_rejection_redirects() {
        let response = AuthRejection::RedirectToLogin("/cart".into()).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").and_then(|v| v.to_str().ok()),
            Some("/login?next=%2Fcart")
        );

        let response = AuthRejection::RedirectHome.into_response();
        assert_eq!(
            response.headers().get("location").and_then(|v| v.to_str().ok()),
            Some("/")
        );
    }
}
