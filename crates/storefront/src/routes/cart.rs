//! Cart endpoints backed by the visitor's session.
//!
//! Every handler answers with the full cart so the SPA can re-render from
//! one response.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use vitrina_core::ProductId;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::services::cart::{Cart, CartView};
use crate::state::AppState;

/// Build the cart router. The caller wraps it in the session layer.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cart", get(show).delete(clear))
        .route("/api/cart/items", post(add_item))
        .route(
            "/api/cart/items/{product_id}",
            put(set_quantity).delete(remove_item),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    #[serde(alias = "product_id")]
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: u32,
}

const fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: u32,
}

fn session_error(e: tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session store: {e}"))
}

/// Join the cart with current catalog data.
async fn render(state: &AppState, cart: &Cart) -> Result<Json<CartView>> {
    if cart.is_empty() {
        return Ok(Json(CartView::default()));
    }
    let products = ProductRepository::new(state.pool())
        .get_many(&cart.product_ids())
        .await?;
    Ok(Json(CartView::build(cart, &products)))
}

/// `GET /api/cart`
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let cart = Cart::load(&session).await;
    render(&state, &cart).await
}

/// `POST /api/cart/items`
#[instrument(skip(state, session))]
pub async fn add_item(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    if body.quantity == 0 {
        return Err(AppError::BadRequest("quantity must be positive".to_owned()));
    }
    if ProductRepository::new(state.pool())
        .get(body.product_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("product not found".to_owned()));
    }

    let mut cart = Cart::load(&session).await;
    cart.add(body.product_id, body.quantity);
    cart.save(&session).await.map_err(session_error)?;

    render(&state, &cart).await
}

/// `PUT /api/cart/items/{product_id}`: zero removes the line.
#[instrument(skip(state, session))]
pub async fn set_quantity(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<ProductId>,
    Json(body): Json<QuantityRequest>,
) -> Result<Json<CartView>> {
    let mut cart = Cart::load(&session).await;
    if !cart.set_quantity(product_id, body.quantity) {
        return Err(AppError::NotFound("product is not in the cart".to_owned()));
    }
    cart.save(&session).await.map_err(session_error)?;

    render(&state, &cart).await
}

/// `DELETE /api/cart/items/{product_id}`
pub async fn remove_item(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CartView>> {
    let mut cart = Cart::load(&session).await;
    if cart.remove(product_id) {
        cart.save(&session).await.map_err(session_error)?;
    }
    render(&state, &cart).await
}

/// `DELETE /api/cart`: drops the whole session.
pub async fn clear(session: Session) -> Result<Json<CartView>> {
    Cart::clear(&session).await.map_err(session_error)?;
    Ok(Json(CartView::default()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_add_item_defaults_to_one() {
        let body: AddItemRequest =
            serde_json::from_value(serde_json::json!({"productId": 3})).unwrap();
        assert_eq!(body.product_id, ProductId::new(3));
        assert_eq!(body.quantity, 1);
    }

    #[test]
    fn test_add_item_accepts_snake_case() {
        let body: AddItemRequest =
            serde_json::from_value(serde_json::json!({"product_id": 3, "quantity": 4})).unwrap();
        assert_eq!(body.quantity, 4);
    }

    #[test]
    fn test_negative_quantity_is_rejected() {
        let body = serde_json::from_value::<QuantityRequest>(serde_json::json!({"quantity": -1}));
        assert!(body.is_err());
    }
}
