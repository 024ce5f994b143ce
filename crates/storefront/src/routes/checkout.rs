//! Checkout: turn the session cart into an order.

use axum::{extract::State, response::Redirect};
use tower_sessions::Session;
use tracing::instrument;

use crate::db::{OrderRepository, PlaceOrderError, ProductRepository};
use crate::error::AppError;
use crate::flash::{self, FlashMessage};
use crate::middleware::RequireBuyer;
use crate::services::{Cart, CheckoutProblem, plan_checkout};
use crate::state::AppState;

/// Place an order for everything in the cart.
///
/// Stock is re-checked and decremented inside the order transaction. The
/// invoice email is best effort: a delivery failure leaves the order in
/// place and shows a warning instead.
#[instrument(skip(state, session, buyer), fields(buyer_id = %buyer.id))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    RequireBuyer(buyer): RequireBuyer,
) -> Result<Redirect, AppError> {
    let cart = Cart::load(&session).await;
    if cart.is_empty() {
        flash::push(&session, FlashMessage::warning("Your cart is empty.")).await;
        return Ok(Redirect::to("/cart"));
    }

    let product_repo = ProductRepository::new(state.pool());
    let products = product_repo.get_many(&cart.product_ids()).await?;

    let plan = match plan_checkout(&cart, &products) {
        Ok(plan) => plan,
        Err(problems) => {
            tracing::info!(problems = problems.len(), "Checkout refused");
            let messages: Vec<FlashMessage> = problems
                .iter()
                .map(|problem| FlashMessage::error(problem.to_string()))
                .collect();
            flash::push_all(&session, messages).await;
            return Ok(Redirect::to("/cart"));
        }
    };

    let orders = OrderRepository::new(state.pool());
    let order = match orders.place_order(buyer.id, &plan.lines, plan.total).await {
        Ok(order) => order,
        Err(PlaceOrderError::InsufficientStock(product_id)) => {
            // Someone else bought the stock between planning and placing.
            let problem = match product_repo.get_by_id(product_id).await? {
                Some(product) if product.in_stock() => CheckoutProblem::Insufficient {
                    name: product.name,
                    available: product.stock_quantity,
                },
                Some(product) => CheckoutProblem::OutOfStock { name: product.name },
                None => CheckoutProblem::Missing(product_id),
            };
            tracing::info!(product_id = %product_id, "Checkout lost a stock race");
            flash::push(&session, FlashMessage::error(problem.to_string())).await;
            return Ok(Redirect::to("/cart"));
        }
        Err(PlaceOrderError::Repository(e)) => return Err(e.into()),
    };
    tracing::info!(order_id = %order.id, total = %order.total_amount, "Order placed");

    Cart::clear(&session).await?;

    let message = match state
        .email()
        .send_invoice(&buyer.email, &order, &plan.lines)
        .await
    {
        Ok(()) => {
            if let Err(e) = orders.mark_invoice_sent(order.id).await {
                tracing::error!(order_id = %order.id, error = %e, "Failed to record invoice delivery");
            }
            FlashMessage::success("Order placed successfully! Invoice sent to your email.")
        }
        Err(e) => {
            tracing::warn!(order_id = %order.id, error = %e, "Failed to send invoice email");
            FlashMessage::warning(format!(
                "Order placed successfully, but email could not be sent: {e}"
            ))
        }
    };
    flash::push(&session, message).await;

    Ok(Redirect::to(&format!("/order/{}", order.id)))
}
