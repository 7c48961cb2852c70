//! Category endpoints. Reads are public; writes need staff.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use tracing::instrument;

use vitrina_core::{AuditSeverity, CategoryId};

use crate::db::CategoryRepository;
use crate::error::{AppError, Result};
use crate::middleware::{ClientInfo, RequireStaff};
use crate::models::{Category, CategoryInput, NewAuditEntry};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list).post(create))
        .route("/api/categories/{id}", get(show).put(update).delete(remove))
}

fn require_name(input: &CategoryInput) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_owned()));
    }
    Ok(())
}

/// `GET /api/categories`
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(CategoryRepository::new(state.pool()).list().await?))
}

/// `GET /api/categories/{id}`
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>> {
    CategoryRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("category not found".to_owned()))
}

/// `POST /api/categories` (staff)
#[instrument(skip(state, client, input), fields(actor = %staff.id))]
pub async fn create(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    client: ClientInfo,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    require_name(&input)?;
    let category = CategoryRepository::new(state.pool()).create(&input).await?;

    state.audit().record(
        NewAuditEntry::new("CATEGORY_CREATE", AuditSeverity::Low)
            .actor(staff.id)
            .target("category", category.id.as_i32())
            .new_values(&category)
            .client(&client),
    );

    Ok((StatusCode::CREATED, Json(category)))
}

/// `PUT /api/categories/{id}` (staff)
#[instrument(skip(state, client, input), fields(actor = %staff.id))]
pub async fn update(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    client: ClientInfo,
    Path(id): Path<CategoryId>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>> {
    require_name(&input)?;
    let repo = CategoryRepository::new(state.pool());
    let before = repo.get(id).await?;
    let category = repo.update(id, &input).await?;

    let mut entry = NewAuditEntry::new("CATEGORY_UPDATE", AuditSeverity::Low)
        .actor(staff.id)
        .target("category", id.as_i32())
        .new_values(&category)
        .client(&client);
    if let Some(before) = &before {
        entry = entry.old_values(before);
    }
    state.audit().record(entry);

    Ok(Json(category))
}

/// `DELETE /api/categories/{id}` (staff)
#[instrument(skip(state, client), fields(actor = %staff.id))]
pub async fn remove(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    client: ClientInfo,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    let repo = CategoryRepository::new(state.pool());
    let before = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("category not found".to_owned()))?;
    repo.delete(id).await?;

    state.audit().record(
        NewAuditEntry::new("CATEGORY_DELETE", AuditSeverity::Medium)
            .actor(staff.id)
            .target("category", id.as_i32())
            .old_values(&before)
            .client(&client),
    );

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_require_name() {
        let blank = CategoryInput {
            name: "   ".to_owned(),
            description: None,
        };
        assert!(matches!(require_name(&blank), Err(AppError::BadRequest(_))));

        let named = CategoryInput {
            name: "Посуда".to_owned(),
            description: Some("Кухня".to_owned()),
        };
        assert!(require_name(&named).is_ok());
    }
}
