//! Order detail and order history for buyers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::OrderId;

use super::{IdPath, PageContext};
use crate::db::OrderRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireBuyer;
use crate::models::{Order, OrderItem};
use crate::state::AppState;

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub page: PageContext,
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/list.html")]
pub struct OrderListTemplate {
    pub page: PageContext,
    pub orders: Vec<Order>,
}

/// Display one of the buyer's orders.
#[instrument(skip(state, session, buyer), fields(buyer_id = %buyer.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireBuyer(buyer): RequireBuyer,
    IdPath(id): IdPath<OrderId>,
) -> Result<OrderShowTemplate, AppError> {
    let orders = OrderRepository::new(state.pool());
    let order = orders
        .get_for_buyer(id, buyer.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    let items = orders.items(order.id).await?;

    Ok(OrderShowTemplate {
        page: PageContext::load(&session).await,
        order,
        items,
    })
}

/// List the buyer's orders, newest first.
#[instrument(skip(state, session, buyer), fields(buyer_id = %buyer.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireBuyer(buyer): RequireBuyer,
) -> Result<OrderListTemplate, AppError> {
    let orders = OrderRepository::new(state.pool())
        .list_for_buyer(buyer.id)
        .await?;

    Ok(OrderListTemplate {
        page: PageContext::load(&session).await,
        orders,
    })
}
