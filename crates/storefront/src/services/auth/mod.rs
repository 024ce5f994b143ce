//! Authentication service.
//!
//! Password accounts for vendors and buyers, plus single-use password reset
//! tokens.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sqlx::PgPool;

use bazaar_core::{Email, Role};

use crate::db::RepositoryError;
use crate::db::reset_tokens::ResetTokenRepository;
use crate::db::users::{NewUser, UserRepository};
use crate::forms::Registration;
use crate::models::{PasswordResetToken, User};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Random bytes in a reset token before encoding.
const RESET_TOKEN_BYTES: usize = 32;

/// Authentication service.
///
/// Handles registration, login, and password resets.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: ResetTokenRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens: ResetTokenRepository::new(pool),
        }
    }

    /// Create an account from a validated registration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the username or email is taken.
    pub async fn register(&self, registration: &Registration, role: Role) -> Result<User, AuthError> {
        if let Some(problem) = password_problems(&registration.password).first() {
            return Err(AuthError::WeakPassword((*problem).to_owned()));
        }

        let password_hash = hash_password(&registration.password)?;

        let user = self
            .users
            .create(&NewUser {
                username: &registration.username,
                email: &registration.email,
                first_name: &registration.first_name,
                last_name: &registration.last_name,
                role,
                password_hash: &password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, role = %role, "Account registered");
        Ok(user)
    }

    /// Login with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let (user, password_hash) = self
            .users
            .get_password_hash(username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Issue a reset token for the account registered with `email`.
    ///
    /// Earlier unused tokens for the same account stop working.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account uses the email.
    pub async fn issue_reset_token(
        &self,
        email: &Email,
    ) -> Result<(User, PasswordResetToken), AuthError> {
        let user = self
            .users
            .get_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let token = self.tokens.issue(user.id, &generate_reset_token()).await?;
        tracing::info!(user_id = %user.id, "Password reset token issued");

        Ok((user, token))
    }

    /// Look up a reset token that can still be redeemed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetToken` for an unknown token and
    /// `AuthError::ExpiredResetToken` for a used or expired one.
    pub async fn valid_reset_token(&self, token: &str) -> Result<PasswordResetToken, AuthError> {
        let token = self
            .tokens
            .get_by_token(token)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        if token.is_valid() {
            Ok(token)
        } else {
            Err(AuthError::ExpiredResetToken)
        }
    }

    /// Set a new password and consume the token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ExpiredResetToken` if the token was consumed or
    /// expired in the meantime.
    pub async fn reset_password(
        &self,
        token: &PasswordResetToken,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let password_hash = hash_password(new_password)?;

        self.tokens
            .redeem(token.id, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::ExpiredResetToken,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %token.user_id, "Password reset");
        Ok(())
    }

    /// Replace the password of the account named `username`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserNotFound` if no account has that username.
    pub async fn set_password(&self, username: &str, new_password: &str) -> Result<User, AuthError> {
        if let Some(problem) = password_problems(new_password).first() {
            return Err(AuthError::WeakPassword((*problem).to_owned()));
        }

        let (user, _) = self
            .users
            .get_password_hash(username.trim())
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let password_hash = hash_password(new_password)?;
        self.users
            .set_password_hash(user.id, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "Password changed");
        Ok(user)
    }
}

/// Human-readable reasons `password` is too weak. Empty when acceptable.
#[must_use]
pub fn password_problems(password: &str) -> Vec<&'static str> {
    let mut problems = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push("This password is too short. It must contain at least 8 characters.");
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.");
    }
    problems
}

/// A fresh URL-safe reset token (43 characters).
#[must_use]
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse").expect("hash");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_password_problems() {
        assert!(password_problems("long enough").is_empty());
        assert_eq!(password_problems("short").len(), 1);
        assert_eq!(password_problems("12345678"), ["This password is entirely numeric."]);
        assert_eq!(password_problems("123").len(), 2);
    }

    #[test]
    fn test_reset_tokens_are_url_safe_and_unique() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(a, b);
    }
}
