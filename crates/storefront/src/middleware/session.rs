//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. The session
//! holds the logged-in user, the buyer's cart and pending flash messages.
//! The session cookie is signed with a key derived from the session secret.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha512};
use sqlx::PgPool;
use tower_sessions::cookie::Key;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "bazaar_session";

/// Session expiry time in seconds (14 days).
const SESSION_EXPIRY_SECONDS: i64 = 14 * 24 * 60 * 60;

/// Create the session layer with `PostgreSQL` store.
///
/// The `tower_sessions` table is created by `bazaar-cli migrate`.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore, tower_sessions::service::SignedCookie> {
    session_layer(
        PostgresStore::new(pool.clone()),
        &config.session_secret,
        config.is_https(),
    )
}

/// Wrap any session store with the storefront's cookie settings.
#[must_use]
pub fn session_layer<S: SessionStore>(
    store: S,
    secret: &SecretString,
    secure: bool,
) -> SessionManagerLayer<S, tower_sessions::service::SignedCookie> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(signing_key(secret))
}

/// Derive the 64-byte cookie signing key from the configured secret.
fn signing_key(secret: &SecretString) -> Key {
    Key::from(Sha512::digest(secret.expose_secret().as_bytes()).as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_key_is_stable() {
        let secret = SecretString::from("k3y-material-for-tests-0123456789abcdef");
        let a = signing_key(&secret);
        let b = signing_key(&secret);
        assert_eq!(a.signing(), b.signing());

        let other = signing_key(&SecretString::from("another-secret-value-9876543210zyxw"));
        assert_ne!(a.signing(), other.signing());
    }
}
