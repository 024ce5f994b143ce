//! Review star ratings.

use serde::{Deserialize, Serialize};

/// Error returned for a rating outside 1..=5.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Rating must be between 1 and 5.")]
pub struct RatingError;

/// A product rating from one to five stars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 5;

    /// Number of stars.
    #[must_use]
    pub const fn stars(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i32> for Rating {
    type Error = RatingError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            u8::try_from(value).map(Self).map_err(|_| RatingError)
        } else {
            Err(RatingError)
        }
    }
}

impl From<Rating> for i32 {
    fn from(rating: Rating) -> Self {
        Self::from(rating.0)
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::try_from(0).is_err());
        assert!(Rating::try_from(6).is_err());
        assert!(Rating::try_from(-3).is_err());
        assert_eq!(Rating::try_from(1).map(|r| r.stars()), Ok(1));
        assert_eq!(Rating::try_from(5).map(|r| r.stars()), Ok(5));
    }

    #[test]
    fn test_rating_error_message() {
        assert_eq!(RatingError.to_string(), "Rating must be between 1 and 5.");
    }

    #[test]
    fn test_rating_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Rating>("7").is_err());
        let rating: Rating = serde_json::from_str("4").expect("in range");
        assert_eq!(i32::from(rating), 4);
    }
}
