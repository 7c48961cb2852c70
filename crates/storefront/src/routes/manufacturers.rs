//! Manufacturer endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use tracing::instrument;

use vitrina_core::{AuditSeverity, ManufacturerId};

use crate::db::ManufacturerRepository;
use crate::error::{AppError, Result};
use crate::middleware::{ClientInfo, RequireStaff};
use crate::models::{Manufacturer, ManufacturerInput, NewAuditEntry};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/manufacturers", get(list).post(create))
        .route(
            "/api/manufacturers/{id}",
            get(show).put(update).delete(remove),
        )
}

fn validated(input: &ManufacturerInput) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_owned()));
    }
    Ok(())
}

/// `GET /api/manufacturers`
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Manufacturer>>> {
    Ok(Json(ManufacturerRepository::new(state.pool()).list().await?))
}

/// `GET /api/manufacturers/{id}`
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ManufacturerId>,
) -> Result<Json<Manufacturer>> {
    ManufacturerRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("manufacturer not found".to_owned()))
}

/// `POST /api/manufacturers` (staff)
#[instrument(skip(state, client, input), fields(actor = %staff.id))]
pub async fn create(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    client: ClientInfo,
    Json(input): Json<ManufacturerInput>,
) -> Result<(StatusCode, Json<Manufacturer>)> {
    validated(&input)?;
    let manufacturer = ManufacturerRepository::new(state.pool())
        .create(&input)
        .await?;

    state.audit().record(
        NewAuditEntry::new("MANUFACTURER_CREATE", AuditSeverity::Low)
            .actor(staff.id)
            .target("manufacturer", manufacturer.id.as_i32())
            .new_values(&manufacturer)
            .client(&client),
    );

    Ok((StatusCode::CREATED, Json(manufacturer)))
}

/// `PUT /api/manufacturers/{id}` (staff)
#[instrument(skip(state, client, input), fields(actor = %staff.id))]
pub async fn update(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    client: ClientInfo,
    Path(id): Path<ManufacturerId>,
    Json(input): Json<ManufacturerInput>,
) -> Result<Json<Manufacturer>> {
    validated(&input)?;
    let repo = ManufacturerRepository::new(state.pool());
    let before = repo.get(id).await?;
    let manufacturer = repo.update(id, &input).await?;

    let mut entry = NewAuditEntry::new("MANUFACTURER_UPDATE", AuditSeverity::Low)
        .actor(staff.id)
        .target("manufacturer", id.as_i32())
        .new_values(&manufacturer)
        .client(&client);
    if let Some(before) = &before {
        entry = entry.old_values(before);
    }
    state.audit().record(entry);

    Ok(Json(manufacturer))
}

/// `DELETE /api/manufacturers/{id}` (staff)
#[instrument(skip(state, client), fields(actor = %staff.id))]
pub async fn remove(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    client: ClientInfo,
    Path(id): Path<ManufacturerId>,
) -> Result<StatusCode> {
    let repo = ManufacturerRepository::new(state.pool());
    let before = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("manufacturer not found".to_owned()))?;
    repo.delete(id).await?;

    state.audit().record(
        NewAuditEntry::new("MANUFACTURER_DELETE", AuditSeverity::Medium)
            .actor(staff.id)
            .target("manufacturer", id.as_i32())
            .old_values(&before)
            .client(&client),
    );

    Ok(StatusCode::NO_CONTENT)
}
