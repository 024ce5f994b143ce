//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong password or unknown username.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No account matches the lookup.
    #[error("user not found")]
    UserNotFound,

    /// Username or email is taken.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password does not meet requirements.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Reset token does not exist.
    #[error("invalid reset token")]
    InvalidResetToken,

    /// Reset token was used or has expired.
    #[error("reset token expired or already used")]
    ExpiredResetToken,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
