//! Database backup management (admin).
//!
//! # Routes
//!
//! - `POST /api/backup/create` - dump the database
//! - `GET /api/backup/list` - recorded backups, newest first
//! - `GET /api/backup/download/{filename}` - stream a dump file
//! - `POST /api/backup/restore` - replay a dump into the live database
//! - `DELETE /api/backup/{filename}` - remove a dump and its row
//! - `POST /api/backup/cleanup` - delete dumps past the retention period

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::{info, instrument};

use vitrina_core::AuditSeverity;

use crate::error::{AppError, Result};
use crate::middleware::{ClientInfo, RequireAdmin};
use crate::models::{BackupRecord, BackupSummary, NewAuditEntry};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/backup/create", post(create))
        .route("/api/backup/list", get(list))
        .route("/api/backup/download/{filename}", get(download))
        .route("/api/backup/restore", post(restore))
        .route("/api/backup/cleanup", post(cleanup))
        .route("/api/backup/{filename}", delete(remove))
}

#[derive(Debug, Serialize)]
pub struct Created {
    pub success: bool,
    pub backup: BackupRecord,
}

#[derive(Debug, Serialize)]
pub struct Listing {
    pub success: bool,
    pub backups: Vec<BackupSummary>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RestoreRequest {
    pub filename: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupRequest {
    pub retention_days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CleanupResult {
    pub success: bool,
    pub deleted: usize,
}

#[derive(Debug, Serialize)]
struct Filename<'a> {
    filename: &'a str,
}

/// `POST /api/backup/create`
#[instrument(skip(state, client), fields(admin_id = %admin.id))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    client: ClientInfo,
) -> Result<Json<Created>> {
    let backup = state.backups().create(Some(admin.id)).await?;

    state.audit().record(
        NewAuditEntry::new("BACKUP_CREATE", AuditSeverity::Medium)
            .actor(admin.id)
            .target("backup", backup.backup_id.as_i32())
            .new_values(&backup)
            .client(&client),
    );

    Ok(Json(Created {
        success: true,
        backup,
    }))
}

/// `GET /api/backup/list`
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Listing>> {
    Ok(Json(Listing {
        success: true,
        backups: state.backups().list().await?,
    }))
}

/// `GET /api/backup/download/{filename}`
#[instrument(skip(state), fields(admin_id = %admin.id))]
pub async fn download(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response> {
    let path = state.backups().locate(&filename).await?;
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| AppError::Internal(format!("open {}: {e}", path.display())))?;

    info!(filename, "backup download started");
    let headers = [
        (header::CONTENT_TYPE, "application/sql".to_owned()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

/// `POST /api/backup/restore` with `{filename}`
#[instrument(skip(state, client, body), fields(admin_id = %admin.id))]
pub async fn restore(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    client: ClientInfo,
    Json(body): Json<RestoreRequest>,
) -> Result<Json<serde_json::Value>> {
    let filename = body
        .filename
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("filename is required".to_owned()))?;

    state.backups().restore(&filename).await?;

    state.audit().record(
        NewAuditEntry::new("BACKUP_RESTORE", AuditSeverity::High)
            .actor(admin.id)
            .new_values(&Filename {
                filename: &filename,
            })
            .client(&client),
    );

    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("Database restored from {filename}"),
    })))
}

/// `DELETE /api/backup/{filename}`
#[instrument(skip(state, client), fields(admin_id = %admin.id))]
pub async fn remove(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    client: ClientInfo,
    Path(filename): Path<String>,
) -> Result<Json<serde_json::Value>> {
    state.backups().delete(&filename).await?;

    state.audit().record(
        NewAuditEntry::new("BACKUP_DELETE", AuditSeverity::High)
            .actor(admin.id)
            .old_values(&Filename {
                filename: &filename,
            })
            .client(&client),
    );

    Ok(Json(serde_json::json!({ "success": true })))
}

/// `POST /api/backup/cleanup` with optional `{retentionDays}`
///
/// An absent or empty body uses the configured retention period.
#[instrument(skip(state, client, body), fields(admin_id = %admin.id))]
pub async fn cleanup(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    client: ClientInfo,
    body: Option<Json<CleanupRequest>>,
) -> Result<Json<CleanupResult>> {
    let days = body
        .and_then(|Json(b)| b.retention_days)
        .unwrap_or_else(|| state.backups().retention_days());

    let deleted = state.backups().cleanup(days).await?;

    state.audit().record(
        NewAuditEntry::new("BACKUP_CLEANUP", AuditSeverity::Medium)
            .actor(admin.id)
            .new_values(&serde_json::json!({ "retentionDays": days, "deleted": deleted }))
            .client(&client),
    );

    Ok(Json(CleanupResult {
        success: true,
        deleted,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_request_reads_camel_case() {
        let body: CleanupRequest =
            serde_json::from_value(serde_json::json!({"retentionDays": 7})).unwrap();
        assert_eq!(body.retention_days, Some(7));

        let body: CleanupRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(body.retention_days, None);
    }

    #[test]
    fn test_restore_request_filename_is_optional() {
        let body: RestoreRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(body.filename.is_none());
    }
}
