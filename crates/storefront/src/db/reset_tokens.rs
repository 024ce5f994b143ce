//! Password reset token repository.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use bazaar_core::{ResetTokenId, UserId};

use super::RepositoryError;
use crate::models::PasswordResetToken;
use crate::models::reset_token::RESET_TOKEN_LIFETIME_HOURS;

#[derive(Debug, sqlx::FromRow)]
struct ResetTokenRow {
    id: ResetTokenId,
    user_id: UserId,
    token: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    used: bool,
}

impl From<ResetTokenRow> for PasswordResetToken {
    fn from(row: ResetTokenRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            token: row.token,
            created_at: row.created_at,
            expires_at: row.expires_at,
            used: row.used,
        }
    }
}

/// Repository for password reset tokens.
pub struct ResetTokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ResetTokenRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a fresh token for `user_id`, invalidating the user's earlier
    /// unused tokens.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a token collision.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn issue(
        &self,
        user_id: UserId,
        token: &str,
    ) -> Result<PasswordResetToken, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE bazaar.password_reset_token SET used = TRUE WHERE user_id = $1 AND NOT used",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let created_at = Utc::now();
        let expires_at = created_at + Duration::hours(RESET_TOKEN_LIFETIME_HOURS);

        let row = sqlx::query_as::<_, ResetTokenRow>(
            r"
            INSERT INTO bazaar.password_reset_token (user_id, token, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, token, created_at, expires_at, used
            ",
        )
        .bind(user_id)
        .bind(token)
        .bind(created_at)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(super::conflict_on_unique)?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Look up a token by its value, regardless of validity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_token(
        &self,
        token: &str,
    ) -> Result<Option<PasswordResetToken>, RepositoryError> {
        let row = sqlx::query_as::<_, ResetTokenRow>(
            r"
            SELECT id, user_id, token, created_at, expires_at, used
            FROM bazaar.password_reset_token
            WHERE token = $1
            ",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Set a new password hash and consume the token in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the token was consumed
    /// concurrently or has expired.
    pub async fn redeem(
        &self,
        id: ResetTokenId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let user_id: Option<UserId> = sqlx::query_scalar(
            r"
            UPDATE bazaar.password_reset_token
            SET used = TRUE
            WHERE id = $1 AND NOT used AND expires_at > NOW()
            RETURNING user_id
            ",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let user_id = user_id.ok_or(RepositoryError::NotFound)?;

        sqlx::query("UPDATE bazaar.user SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Delete expired and used tokens. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn purge_stale(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM bazaar.password_reset_token WHERE used OR expires_at <= NOW()",
        )
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
