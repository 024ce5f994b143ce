//! Product detail page.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::ProductId;

use super::{IdPath, PageContext};
use crate::db::reviews::average_rating;
use crate::db::{OrderRepository, ProductRepository, ReviewRepository, StoreRepository};
use crate::error::AppError;
use crate::filters;
use crate::models::{Product, Review, ReviewWithAuthor, Store};
use crate::state::AppState;

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: PageContext,
    pub product: Product,
    pub store: Store,
    pub reviews: Vec<ReviewWithAuthor>,
    pub average_rating: Option<f64>,
    /// Whether the viewing buyer has ordered this product before.
    pub has_purchased: bool,
    /// The viewing buyer's own review.
    pub user_review: Option<Review>,
}

impl ProductShowTemplate {
    /// Average rating as shown next to the review count, e.g. `4.5`.
    #[must_use]
    pub fn average_label(&self) -> Option<String> {
        self.average_rating.map(|avg| format!("{avg:.1}"))
    }
}

/// Display a product with its store and reviews.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    IdPath(id): IdPath<ProductId>,
) -> Result<ProductShowTemplate, AppError> {
    let product = ProductRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    let store = StoreRepository::new(state.pool())
        .get_by_id(product.store_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("store {}", product.store_id)))?;

    let review_repo = ReviewRepository::new(state.pool());
    let reviews = review_repo.list_for_product(id).await?;
    let average_rating = average_rating(&reviews);

    let page = PageContext::load(&session).await;
    let (has_purchased, user_review) = match &page.user {
        Some(user) if user.role.is_buyer() => (
            OrderRepository::new(state.pool())
                .has_purchased(user.id, id)
                .await?,
            review_repo.get_by_author(id, user.id).await?,
        ),
        _ => (false, None),
    };

    Ok(ProductShowTemplate {
        page,
        product,
        store,
        reviews,
        average_rating,
        has_purchased,
        user_review,
    })
}
