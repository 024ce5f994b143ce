//! Review form.

use serde::Deserialize;

use bazaar_core::{Rating, RatingError};

use super::{FormErrors, REQUIRED};
use crate::models::Review;

/// Rating and comment for a product review.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReviewForm {
    pub rating: String,
    pub comment: String,
}

/// A validated review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewInput {
    pub rating: Rating,
    pub comment: String,
}

impl ReviewForm {
    /// Pre-filled form from an existing review.
    #[must_use]
    pub fn from_review(review: &Review) -> Self {
        Self {
            rating: review.rating.to_string(),
            comment: review.comment.clone(),
        }
    }

    /// Validate rating and comment.
    ///
    /// # Errors
    ///
    /// Returns [`FormErrors`] for a missing or out-of-range rating or an
    /// empty comment.
    pub fn validate(&self) -> Result<ReviewInput, FormErrors> {
        let mut errors = FormErrors::default();

        let raw = self.rating.trim();
        let rating = if raw.is_empty() {
            errors.add("rating", REQUIRED);
            None
        } else if let Ok(value) = raw.parse::<i32>() {
            match Rating::try_from(value) {
                Ok(rating) => Some(rating),
                Err(RatingError) => {
                    errors.add("rating", RatingError.to_string());
                    None
                }
            }
        } else {
            errors.add("rating", "Enter a whole number.");
            None
        };

        let comment = self.comment.trim().to_owned();
        if comment.is_empty() {
            errors.add("comment", REQUIRED);
        }

        match rating {
            Some(rating) if errors.is_empty() => Ok(ReviewInput { rating, comment }),
            _ => Err(errors),
        }
    }
}
