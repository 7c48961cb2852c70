//! Order payments.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::{info, instrument};

use vitrina_core::{AuditSeverity, OrderId, PaymentMethod, PaymentStatus};

use crate::db::{OrderRepository, PaymentRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::{ClientInfo, RequireAuth, RequireStaff};
use crate::models::{NewAuditEntry, Payment};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/payments", post(upsert))
        .route("/api/payments/{order_id}", get(show))
}

/// Method and status are free text; unknown values normalize to the
/// defaults of [`PaymentMethod`] and [`PaymentStatus`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub order_id: OrderId,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub status: String,
}

/// `POST /api/payments` (staff)
#[instrument(skip(state, client, body), fields(actor = %staff.id, order_id = %body.order_id))]
pub async fn upsert(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    client: ClientInfo,
    Json(body): Json<PaymentRequest>,
) -> Result<Json<Payment>> {
    let method = PaymentMethod::normalize(&body.method);
    let status = PaymentStatus::normalize(&body.status);

    let repo = PaymentRepository::new(state.pool());
    let before = repo.get_by_order(body.order_id).await?;
    let payment = repo
        .upsert(body.order_id, method, status)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("order not found".to_owned()),
            other => other.into(),
        })?;

    info!(payment_id = %payment.id, status = status.as_str(), "payment recorded");
    let mut entry = NewAuditEntry::new("PAYMENT_UPSERT", AuditSeverity::Medium)
        .actor(staff.id)
        .target("payment", payment.id.as_i32())
        .new_values(&payment)
        .client(&client);
    if let Some(before) = &before {
        entry = entry.old_values(before);
    }
    state.audit().record(entry);

    Ok(Json(payment))
}

/// `GET /api/payments/{order_id}`: owner or staff.
pub async fn show(
    RequireAuth(auth): RequireAuth,
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Payment>> {
    let owner = OrderRepository::new(state.pool())
        .owner(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("order not found".to_owned()))?;
    if !auth.can_access(owner) {
        return Err(AppError::Forbidden("not your order".to_owned()));
    }

    PaymentRepository::new(state.pool())
        .get_by_order(order_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("payment not found".to_owned()))
}
