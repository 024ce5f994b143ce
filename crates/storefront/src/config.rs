//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAZAAR_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `BAZAAR_BASE_URL` - Public URL for the storefront, used in emailed links
//! - `BAZAAR_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `BAZAAR_HOST` - Bind address (default: 127.0.0.1)
//! - `BAZAAR_PORT` - Listen port (default: 3000)
//! - `BAZAAR_MEDIA_ROOT` - Directory for uploaded images (default: media)
//! - `BAZAAR_STATIC_DIR` - Directory of static assets (default: crates/storefront/static)
//! - `SMTP_HOST` - SMTP relay; when unset, emails are written to the log
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `SMTP_USERNAME` / `SMTP_PASSWORD` - SMTP credentials (required with `SMTP_HOST`)
//! - `EMAIL_FROM` - Sender address (default: noreply@bazaar.local)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

/// Shortest accepted `BAZAAR_SESSION_SECRET`.
const SESSION_SECRET_MIN_LEN: usize = 32;

/// Lowest accepted Shannon entropy of the session secret, in bits per char.
const SESSION_SECRET_MIN_BITS: f64 = 3.3;

/// Fragments that mark a session secret as copied from sample config.
const SAMPLE_SECRET_FRAGMENTS: &[&str] = &[
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "bazaar",
    "your-",
    "put-your",
    "insert",
    "xxx",
    "todo",
];

/// Why the storefront configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
    #[error("{var} is not safe to use: {reason}")]
    WeakSecret { var: &'static str, reason: String },
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront, without trailing slash
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Where uploaded product images are written
    pub media_root: PathBuf,
    /// Where static assets are served from
    pub static_dir: PathBuf,
    /// Outgoing email settings
    pub email: EmailConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Outgoing email configuration.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Sender address (From header)
    pub from_address: String,
    /// SMTP relay; `None` logs messages instead of sending them
    pub smtp: Option<SmtpConfig>,
}

/// SMTP relay configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine.
        let _ = dotenvy::dotenv();

        let session_secret = required_var("BAZAAR_SESSION_SECRET")?;
        check_session_secret(&session_secret).map_err(|reason| ConfigError::WeakSecret {
            var: "BAZAAR_SESSION_SECRET",
            reason,
        })?;

        Ok(Self {
            database_url: database_url()?,
            host: parsed_var("BAZAAR_HOST", "127.0.0.1")?,
            port: parsed_var("BAZAAR_PORT", "3000")?,
            base_url: parse_base_url(&required_var("BAZAAR_BASE_URL")?)?,
            session_secret: SecretString::from(session_secret),
            media_root: PathBuf::from(var_or("BAZAAR_MEDIA_ROOT", "media")),
            static_dir: PathBuf::from(var_or("BAZAAR_STATIC_DIR", "crates/storefront/static")),
            email: EmailConfig::from_env()?,
            sentry_dsn: optional_var("SENTRY_DSN"),
            sentry_environment: optional_var("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Absolute URL for a site path such as `/login`.
    #[must_use]
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let smtp = optional_var("SMTP_HOST")
            .map(|host| {
                Ok::<_, ConfigError>(SmtpConfig {
                    host,
                    port: parsed_var("SMTP_PORT", "587")?,
                    username: required_var("SMTP_USERNAME")?,
                    password: SecretString::from(required_var("SMTP_PASSWORD")?),
                })
            })
            .transpose()?;

        Ok(Self {
            from_address: var_or("EMAIL_FROM", "noreply@bazaar.local"),
            smtp,
        })
    }
}

fn required_var(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::Missing(key))
}

/// Empty values count as unset.
fn optional_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn var_or(key: &str, default: &str) -> String {
    optional_var(key).unwrap_or_else(|| default.to_string())
}

fn parsed_var<T>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var_or(key, default)
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            var: key,
            reason: e.to_string(),
        })
}

/// `BAZAAR_DATABASE_URL`, or the conventional `DATABASE_URL`.
fn database_url() -> Result<SecretString, ConfigError> {
    optional_var("BAZAAR_DATABASE_URL")
        .or_else(|| optional_var("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or(ConfigError::Missing("BAZAAR_DATABASE_URL"))
}

/// Validate the base URL and strip any trailing slash.
fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var: "BAZAAR_BASE_URL",
        reason,
    };
    let url = url::Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Reject session secrets that are short, copied from sample config, or
/// too repetitive to resist guessing.
fn check_session_secret(secret: &str) -> Result<(), String> {
    let length = secret.chars().count();
    if length < SESSION_SECRET_MIN_LEN {
        return Err(format!(
            "needs at least {SESSION_SECRET_MIN_LEN} characters, got {length}"
        ));
    }

    let lower = secret.to_lowercase();
    if let Some(fragment) = SAMPLE_SECRET_FRAGMENTS.iter().find(|f| lower.contains(*f)) {
        return Err(format!("looks like sample config (contains '{fragment}')"));
    }

    let bits = bits_per_char(secret);
    if bits < SESSION_SECRET_MIN_BITS {
        return Err(format!(
            "{bits:.2} bits of entropy per character, need {SESSION_SECRET_MIN_BITS}; generate it randomly"
        ));
    }
    Ok(())
}

/// Shannon entropy of the character distribution.
#[allow(clippy::cast_precision_loss)]
fn bits_per_char(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    let mut total = 0u32;
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }
    counts
        .values()
        .map(|&n| f64::from(n) / f64::from(total))
        .map(|p| -p * p.log2())
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: base_url.to_string(),
            session_secret: SecretString::from("q7Rk2-Lm9vXz4Tn8Wb1Yh6Pd3Gs0Jc5Fa_"),
            media_root: PathBuf::from("media"),
            static_dir: PathBuf::from("static"),
            email: EmailConfig {
                from_address: "noreply@bazaar.local".to_string(),
                smtp: None,
            },
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[test]
    fn test_bits_per_char() {
        assert!(bits_per_char("").abs() < f64::EPSILON);
        assert!((bits_per_char("abab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_session_secret_rejects_short_values() {
        let reason = check_session_secret("Zq8#").unwrap_err();
        assert!(reason.contains("at least 32"));
    }

    #[test]
    fn test_session_secret_rejects_sample_values() {
        assert!(check_session_secret("changeme-changeme-changeme-changeme").is_err());
        assert!(check_session_secret("your-random-value-goes-here-0123456").is_err());
    }

    #[test]
    fn test_session_secret_rejects_repetitive_values() {
        let reason = check_session_secret(&"ab".repeat(20)).unwrap_err();
        assert!(reason.contains("entropy"));
    }

    #[test]
    fn test_session_secret_accepts_random_values() {
        assert!(check_session_secret("q7Rk2-Lm9vXz4Tn8Wb1Yh6Pd3Gs0Jc5Fa_").is_ok());
    }

    #[test]
    fn test_parse_base_url_strips_trailing_slash() {
        assert_eq!(
            parse_base_url("https://shop.example.com/").unwrap(),
            "https://shop.example.com"
        );
        assert!(parse_base_url("not a url").is_err());
        assert!(parse_base_url("ftp://shop.example.com").is_err());
    }

    #[test]
    fn test_socket_addr_and_urls() {
        let config = config("http://localhost:3000");
        let expected: SocketAddr = "127.0.0.1:3000".parse().unwrap();
        assert_eq!(config.socket_addr(), expected);
        assert!(!config.is_https());
        assert_eq!(
            config.absolute_url("/password-reset-confirm/abc/"),
            "http://localhost:3000/password-reset-confirm/abc/"
        );
        assert!(self::config("https://shop.example.com").is_https());
    }

    #[test]
    fn test_smtp_config_debug_redacts_password() {
        let smtp = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "mailer".to_string(),
            password: SecretString::from("hunter2-very-private"),
        };

        let rendered = format!("{smtp:?}");
        assert!(rendered.contains("mailer"));
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("hunter2-very-private"));
    }
}
