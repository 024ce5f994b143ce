//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tower_sessions::Session;
use tracing::instrument;

use super::PageContext;
use crate::db::{ProductRepository, StoreRepository};
use crate::error::AppError;
use crate::filters;
use crate::models::{ProductWithStore, Store};
use crate::state::AppState;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub products: Vec<ProductWithStore>,
    pub stores: Vec<Store>,
}

/// Display every in-stock product and every store.
#[instrument(skip(state, session))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
) -> Result<HomeTemplate, AppError> {
    let products = ProductRepository::new(state.pool()).list_in_stock().await?;
    let stores = StoreRepository::new(state.pool()).list_all().await?;

    Ok(HomeTemplate {
        page: PageContext::load(&session).await,
        products,
        stores,
    })
}
