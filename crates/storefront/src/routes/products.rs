//! Product catalog endpoints.
//!
//! Reads are public; writes need a manager or admin.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use tracing::{info, instrument};

use vitrina_core::{AuditSeverity, ProductId};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::{ClientInfo, RequireStaff};
use crate::models::{NewAuditEntry, Product, ProductInput};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list).post(create))
        .route("/api/products/{id}", get(show).put(update).delete(remove))
}

/// `GET /api/products`
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(ProductRepository::new(state.pool()).list().await?))
}

/// `GET /api/products/{id}`
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("product not found".to_owned()))
}

/// `POST /api/products` (staff)
#[instrument(skip(state, client, input), fields(actor = %staff.id))]
pub async fn create(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    client: ClientInfo,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    input.validate().map_err(AppError::BadRequest)?;

    let product = ProductRepository::new(state.pool()).create(&input).await?;

    info!(product_id = %product.id, "product created");
    state.audit().record(
        NewAuditEntry::new("PRODUCT_CREATE", AuditSeverity::Low)
            .actor(staff.id)
            .target("product", product.id.as_i32())
            .new_values(&input)
            .client(&client),
    );

    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /api/products/{id}` (staff)
#[instrument(skip(state, client, input), fields(actor = %staff.id))]
pub async fn update(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    client: ClientInfo,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    input.validate().map_err(AppError::BadRequest)?;

    let repo = ProductRepository::new(state.pool());
    let before = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("product not found".to_owned()))?;
    let product = repo.update(id, &input).await?;

    state.audit().record(
        NewAuditEntry::new("PRODUCT_UPDATE", AuditSeverity::Low)
            .actor(staff.id)
            .target("product", id.as_i32())
            .old_values(&before)
            .new_values(&input)
            .client(&client),
    );

    Ok(Json(product))
}

/// `DELETE /api/products/{id}` (staff)
#[instrument(skip(state, client), fields(actor = %staff.id))]
pub async fn remove(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    client: ClientInfo,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    let repo = ProductRepository::new(state.pool());
    let before = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("product not found".to_owned()))?;
    repo.delete(id).await?;

    info!(product_id = %id, "product deleted");
    state.audit().record(
        NewAuditEntry::new("PRODUCT_DELETE", AuditSeverity::Medium)
            .actor(staff.id)
            .target("product", id.as_i32())
            .old_values(&before)
            .client(&client),
    );

    Ok(StatusCode::NO_CONTENT)
}
