//! Cart route handlers.
//!
//! The cart lives in the buyer's session; every change redirects back to
//! the cart page (or the product page when adding fails) with a flash
//! message.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{Money, ProductId};

use super::{IdPath, PageContext};
use crate::db::ProductRepository;
use crate::error::AppError;
use crate::filters;
use crate::flash::{self, FlashMessage};
use crate::middleware::RequireBuyer;
use crate::services::cart::{QuantityChange, cart_total};
use crate::services::{Cart, CartLine};
use crate::state::AppState;

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub lines: Vec<CartLine>,
    pub total: Money,
}

/// Update quantity form data. Kept as text so a bad value gets a message
/// instead of a rejection page.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateCartForm {
    pub quantity: String,
}

/// Display the cart, dropping lines that can no longer be bought.
#[instrument(skip(state, session, buyer), fields(buyer_id = %buyer.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireBuyer(buyer): RequireBuyer,
) -> Result<CartShowTemplate, AppError> {
    let mut cart = Cart::load(&session).await;
    let products = ProductRepository::new(state.pool())
        .get_many(&cart.product_ids())
        .await?;

    if cart.prune(&products) {
        tracing::debug!("Pruned unavailable cart lines");
        cart.save(&session).await?;
    }

    let lines = cart.priced_lines(&products);
    let total = cart_total(&lines);

    Ok(CartShowTemplate {
        page: PageContext::load(&session).await,
        lines,
        total,
    })
}

/// Add one unit of a product.
#[instrument(skip(state, session, buyer), fields(buyer_id = %buyer.id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    RequireBuyer(buyer): RequireBuyer,
    IdPath(id): IdPath<ProductId>,
) -> Result<Redirect, AppError> {
    let product = ProductRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let mut cart = Cart::load(&session).await;
    match cart.add(&product) {
        Ok(quantity) => {
            cart.save(&session).await?;
            tracing::debug!(product_id = %id, quantity, "Added to cart");
            flash::push(
                &session,
                FlashMessage::success(format!("{} added to cart!", product.name)),
            )
            .await;
            Ok(Redirect::to("/cart"))
        }
        Err(e) => {
            flash::push(&session, FlashMessage::error(e.to_string())).await;
            Ok(Redirect::to(&format!("/product/{id}")))
        }
    }
}

/// Set a line's quantity; zero or less removes it.
#[instrument(skip(state, session, buyer, form), fields(buyer_id = %buyer.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireBuyer(buyer): RequireBuyer,
    IdPath(id): IdPath<ProductId>,
    Form(form): Form<UpdateCartForm>,
) -> Result<Redirect, AppError> {
    let product = ProductRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let raw = form.quantity.trim();
    let quantity = if raw.is_empty() {
        0
    } else if let Ok(quantity) = raw.parse::<i64>() {
        quantity
    } else {
        flash::push(&session, FlashMessage::error("Enter a whole number.")).await;
        return Ok(Redirect::to("/cart"));
    };

    let mut cart = Cart::load(&session).await;
    let message = match cart.set_quantity(&product, quantity) {
        Ok(QuantityChange::Removed) => FlashMessage::success("Item removed from cart."),
        Ok(QuantityChange::Updated(_)) => FlashMessage::success("Cart updated."),
        Err(e) => FlashMessage::error(e.to_string()),
    };
    cart.save(&session).await?;
    flash::push(&session, message).await;

    Ok(Redirect::to("/cart"))
}

/// Remove a line from the cart.
#[instrument(skip(state, session, buyer), fields(buyer_id = %buyer.id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    RequireBuyer(buyer): RequireBuyer,
    IdPath(id): IdPath<ProductId>,
) -> Result<Redirect, AppError> {
    let mut cart = Cart::load(&session).await;
    if cart.remove(id) {
        cart.save(&session).await?;

        let name = ProductRepository::new(state.pool())
            .get_by_id(id)
            .await?
            .map_or_else(|| "Item".to_owned(), |product| product.name);
        flash::push(
            &session,
            FlashMessage::success(format!("{name} removed from cart.")),
        )
        .await;
    }

    Ok(Redirect::to("/cart"))
}
