//! Review repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bazaar_core::{ProductId, Rating, ReviewId, UserId};

use super::RepositoryError;
use crate::models::{Review, ReviewWithAuthor};

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    product_id: ProductId,
    user_id: UserId,
    rating: i32,
    comment: String,
    is_verified: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let rating = Rating::try_from(row.rating).map_err(|e| {
            RepositoryError::DataCorruption(format!("review {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            user_id: row.user_id,
            rating,
            comment: row.comment,
            is_verified: row.is_verified,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReviewWithAuthorRow {
    #[sqlx(flatten)]
    review: ReviewRow,
    username: String,
}

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Reviews of a product with author names, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ReviewWithAuthor>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewWithAuthorRow>(
            r"
            SELECT r.id, r.product_id, r.user_id, r.rating, r.comment, r.is_verified,
                   r.created_at, u.username
            FROM bazaar.review r
            JOIN bazaar.user u ON u.id = r.user_id
            WHERE r.product_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(ReviewWithAuthor {
                    review: row.review.try_into()?,
                    username: row.username,
                })
            })
            .collect()
    }

    /// The review `user_id` left on `product_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_author(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r"
            SELECT id, product_id, user_id, rating, comment, is_verified, created_at
            FROM bazaar.review
            WHERE product_id = $1 AND user_id = $2
            ",
        )
        .bind(product_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create or replace the single review for (product, user).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn upsert(
        &self,
        product_id: ProductId,
        user_id: UserId,
        rating: Rating,
        comment: &str,
        is_verified: bool,
    ) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r"
            INSERT INTO bazaar.review (product_id, user_id, rating, comment, is_verified)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (product_id, user_id) DO UPDATE
            SET rating = EXCLUDED.rating,
                comment = EXCLUDED.comment,
                is_verified = EXCLUDED.is_verified
            RETURNING id, product_id, user_id, rating, comment, is_verified, created_at
            ",
        )
        .bind(product_id)
        .bind(user_id)
        .bind(i32::from(rating))
        .bind(comment)
        .bind(is_verified)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }
}

/// Mean rating rounded to one decimal place, or `None` without reviews.
#[must_use]
pub fn average_rating(reviews: &[ReviewWithAuthor]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let sum: u32 = reviews.iter().map(|r| u32::from(r.review.rating.stars())).sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = f64::from(sum) / reviews.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(stars: i32) -> ReviewWithAuthor {
        ReviewWithAuthor {
            review: Review {
                id: ReviewId::new(stars),
                product_id: ProductId::new(1),
                user_id: UserId::new(stars),
                rating: Rating::try_from(stars).expect("valid rating"),
                comment: "fine".to_owned(),
                is_verified: false,
                created_at: Utc::now(),
            },
            username: format!("user{stars}"),
        }
    }

    #[test]
    fn test_average_rating_empty() {
        assert_eq!(average_rating(&[]), None);
    }

    #[test]
    fn test_average_rating_rounds_to_one_place() {
        let reviews = [review(5), review(4), review(4)];
        assert_eq!(average_rating(&reviews), Some(4.3));
    }
}
