//! Password reset token domain type.

use chrono::{DateTime, Utc};

use bazaar_core::{ResetTokenId, UserId};

/// How long a reset link stays usable, in hours.
pub const RESET_TOKEN_LIFETIME_HOURS: i64 = 24;

/// A single-use password reset token.
#[derive(Debug, Clone)]
pub struct PasswordResetToken {
    pub id: ResetTokenId,
    pub user_id: UserId,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

impl PasswordResetToken {
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Returns true if this token can still be redeemed at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.is_expired_at(now)
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}
