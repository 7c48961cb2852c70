//! Account endpoints: own profile and admin user management.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use vitrina_core::{AuditSeverity, Role, UserId};

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::{ClientInfo, RequireAdmin, RequireAuth};
use crate::models::{NewAuditEntry, User};
use crate::services::auth::{AuthService, ProfileChange};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list))
        .route("/api/users/me", get(me).put(update_me))
        .route("/api/users/{id}", axum::routing::delete(delete_user))
        .route("/api/users/{id}/role", put(set_role))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct RoleChange {
    pub role: Role,
}

/// `GET /api/users/me`
pub async fn me(RequireAuth(auth): RequireAuth, State(state): State<AppState>) -> Result<Json<User>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_owned()))?;
    Ok(Json(user))
}

/// `PUT /api/users/me`
#[instrument(skip(state, client, body), fields(user_id = %auth.id))]
pub async fn update_me(
    RequireAuth(auth): RequireAuth,
    State(state): State<AppState>,
    client: ClientInfo,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<User>> {
    let change = ProfileChange {
        first_name: body.first_name,
        last_name: body.last_name,
        phone: body.phone,
        current_password: body.current_password,
        new_password: body.new_password.filter(|p| !p.is_empty()),
    };

    let before = UserRepository::new(state.pool()).get_by_id(auth.id).await?;
    let user = AuthService::new(state.pool())
        .update_profile(auth.id, &change)
        .await?;

    let severity = if change.changes_password() {
        AuditSeverity::Medium
    } else {
        AuditSeverity::Low
    };
    let mut entry = NewAuditEntry::new("USER_PROFILE_UPDATE", severity)
        .actor(auth.id)
        .target("user", auth.id.as_i32())
        .new_values(&user)
        .client(&client);
    if let Some(before) = &before {
        entry = entry.old_values(before);
    }
    state.audit().record(entry);

    Ok(Json(user))
}

/// `GET /api/users` (admin)
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>> {
    Ok(Json(UserRepository::new(state.pool()).list().await?))
}

/// `PUT /api/users/{id}/role` (admin)
#[instrument(skip(state, client, body), fields(admin_id = %admin.id))]
pub async fn set_role(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    client: ClientInfo,
    Path(id): Path<UserId>,
    Json(body): Json<SetRoleRequest>,
) -> Result<Json<User>> {
    let role: Role = body
        .role
        .parse()
        .map_err(|e: vitrina_core::RoleParseError| AppError::BadRequest(e.to_string()))?;

    let (previous, user) = UserRepository::new(state.pool()).set_role(id, role).await?;

    info!(user_id = %id, from = %previous, to = %role, "role changed");
    state.audit().record(
        NewAuditEntry::new("USER_ROLE_CHANGE", AuditSeverity::High)
            .actor(admin.id)
            .target("user", id.as_i32())
            .old_values(&RoleChange { role: previous })
            .new_values(&RoleChange { role })
            .client(&client),
    );

    Ok(Json(user))
}

/// `DELETE /api/users/{id}` (admin)
#[instrument(skip(state, client), fields(admin_id = %admin.id))]
pub async fn delete_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    client: ClientInfo,
    Path(id): Path<UserId>,
) -> Result<Json<serde_json::Value>> {
    if id == admin.id {
        return Err(AppError::BadRequest("cannot delete your own account".to_owned()));
    }

    let repo = UserRepository::new(state.pool());
    let user = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_owned()))?;
    repo.delete(id).await?;

    info!(user_id = %id, "user deleted");
    state.audit().record(
        NewAuditEntry::new("USER_DELETE", AuditSeverity::High)
            .actor(admin.id)
            .target("user", id.as_i32())
            .old_values(&user)
            .client(&client),
    );

    Ok(Json(serde_json::json!({ "success": true })))
}
