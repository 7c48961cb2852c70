//! Checkout and order history.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use vitrina_core::{AuditSeverity, OrderId, UserId};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::{AuthUser, ClientInfo, RequireAuth, RequireStaff};
use crate::models::{NewAddress, NewAuditEntry, NewOrder};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list_or_get).post(create))
        .route("/api/orders/{id}/status", put(update_status))
}

/// Checkout body as sent by the SPA.
///
/// `userId` and `items` are required; a missing one is a 400, not a 422.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub address: NewAddress,
    pub delivery_method: Option<String>,
    pub payment_method: Option<String>,
    pub items: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order_id: OrderId,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub user_id: Option<UserId>,
    pub order_id: Option<OrderId>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
struct StatusChange<'a> {
    status: &'a str,
}

/// `POST /api/orders`
#[instrument(skip(state, client, body), fields(actor = %auth.id))]
pub async fn create(
    RequireAuth(auth): RequireAuth,
    State(state): State<AppState>,
    client: ClientInfo,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreated>)> {
    let (Some(user_id), Some(items)) = (body.user_id, body.items) else {
        return Err(AppError::BadRequest("userId and items are required".to_owned()));
    };
    ensure_access(&auth, user_id)?;

    let order = NewOrder {
        user_id,
        address: body.address,
        delivery_method: body.delivery_method,
        payment_method: body.payment_method,
        items,
    };
    let order_id = OrderRepository::new(state.pool()).create(&order).await?;

    info!(order_id = %order_id, user_id = %user_id, "order placed");
    state.audit().record(
        NewAuditEntry::new("ORDER_CREATE", AuditSeverity::Medium)
            .actor(auth.id)
            .target("order", order_id.as_i32())
            .new_values(&serde_json::json!({
                "userId": user_id,
                "deliveryMethod": order.delivery_method,
                "paymentMethod": order.payment_method,
                "items": order.items.len(),
            }))
            .client(&client),
    );

    Ok((StatusCode::CREATED, Json(OrderCreated { order_id })))
}

/// `GET /api/orders`
///
/// - `orderId` given: that order, if the caller owns it or is staff
/// - `userId` given: that user's orders
/// - neither: own orders for clients, every order for staff
pub async fn list_or_get(
    RequireAuth(auth): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> Result<Response> {
    let repo = OrderRepository::new(state.pool());

    if let Some(order_id) = query.order_id {
        let order = repo
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("order not found".to_owned()))?;
        ensure_access(&auth, order.user_id)?;
        return Ok(Json(order).into_response());
    }

    let orders = match query.user_id {
        Some(user_id) => {
            ensure_access(&auth, user_id)?;
            repo.find_by_user(user_id).await?
        }
        None if auth.role.is_staff() => repo.find_all().await?,
        None => repo.find_by_user(auth.id).await?,
    };
    Ok(Json(orders).into_response())
}

/// `PUT /api/orders/{id}/status` (staff)
#[instrument(skip(state, client, body), fields(actor = %staff.id))]
pub async fn update_status(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    client: ClientInfo,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<serde_json::Value>> {
    let status = body.status.trim();
    if status.is_empty() {
        return Err(AppError::BadRequest("status is required".to_owned()));
    }

    let previous = OrderRepository::new(state.pool())
        .update_status(id, status)
        .await?;

    info!(order_id = %id, from = %previous, to = %status, "order status changed");
    state.audit().record(
        NewAuditEntry::new("ORDER_STATUS_UPDATE", AuditSeverity::Medium)
            .actor(staff.id)
            .target("order", id.as_i32())
            .old_values(&StatusChange { status: &previous })
            .new_values(&StatusChange { status })
            .client(&client),
    );

    Ok(Json(serde_json::json!({ "success": true, "status": status })))
}

/// Clients may only touch their own orders; staff may touch any.
fn ensure_access(auth: &AuthUser, owner: UserId) -> Result<()> {
    if auth.can_access(owner) {
        Ok(())
    } else {
        Err(AppError::Forbidden("not your order".to_owned()))
    }
}
