//! Product reviews by buyers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::ProductId;

use super::{IdPath, PageContext};
use crate::db::{OrderRepository, ProductRepository, ReviewRepository};
use crate::error::AppError;
use crate::filters;
use crate::flash::{self, FlashMessage};
use crate::forms::{FormErrors, ReviewForm};
use crate::middleware::RequireBuyer;
use crate::models::Product;
use crate::state::AppState;

/// Review form template.
#[derive(Template, WebTemplate)]
#[template(path = "reviews/form.html")]
pub struct ReviewFormTemplate {
    pub page: PageContext,
    pub product: Product,
    pub form: ReviewForm,
    pub errors: FormErrors,
    pub has_purchased: bool,
    /// Whether this replaces an earlier review.
    pub is_update: bool,
}

async fn find_product(state: &AppState, id: ProductId) -> Result<Product, AppError> {
    ProductRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Display the review form, pre-filled with the buyer's earlier review.
#[instrument(skip(state, session, buyer), fields(buyer_id = %buyer.id))]
pub async fn edit(
    State(state): State<AppState>,
    session: Session,
    RequireBuyer(buyer): RequireBuyer,
    IdPath(id): IdPath<ProductId>,
) -> Result<ReviewFormTemplate, AppError> {
    let product = find_product(&state, id).await?;
    let existing = ReviewRepository::new(state.pool())
        .get_by_author(id, buyer.id)
        .await?;
    let has_purchased = OrderRepository::new(state.pool())
        .has_purchased(buyer.id, id)
        .await?;

    Ok(ReviewFormTemplate {
        page: PageContext::load(&session).await,
        product,
        form: existing
            .as_ref()
            .map(ReviewForm::from_review)
            .unwrap_or_default(),
        errors: FormErrors::default(),
        has_purchased,
        is_update: existing.is_some(),
    })
}

/// Create or replace the buyer's review. It is verified when the buyer has
/// ordered the product.
#[instrument(skip(state, session, buyer, form), fields(buyer_id = %buyer.id))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    RequireBuyer(buyer): RequireBuyer,
    IdPath(id): IdPath<ProductId>,
    Form(form): Form<ReviewForm>,
) -> Result<Response, AppError> {
    let product = find_product(&state, id).await?;
    let has_purchased = OrderRepository::new(state.pool())
        .has_purchased(buyer.id, id)
        .await?;
    let reviews = ReviewRepository::new(state.pool());

    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            let is_update = reviews.get_by_author(id, buyer.id).await?.is_some();
            return Ok(ReviewFormTemplate {
                page: PageContext::load(&session).await,
                product,
                form,
                errors,
                has_purchased,
                is_update,
            }
            .into_response());
        }
    };

    let review = reviews
        .upsert(id, buyer.id, input.rating, &input.comment, has_purchased)
        .await?;
    tracing::info!(review_id = %review.id, product_id = %id, verified = has_purchased, "Review saved");

    flash::push(&session, FlashMessage::success("Review submitted successfully!")).await;
    Ok(Redirect::to(&format!("/product/{id}")).into_response())
}
