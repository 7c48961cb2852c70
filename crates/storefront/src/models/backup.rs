//! Backup metadata types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use vitrina_core::BackupId;

/// Result of a successful backup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    pub backup_id: BackupId,
    pub filename: String,
    pub filepath: String,
    /// Size in bytes.
    pub size: i64,
    pub created_at: DateTime<Utc>,
}

/// A backup as listed in the admin panel.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSummary {
    pub backup_id: BackupId,
    pub filename: String,
    pub filepath: String,
    /// Size in kilobytes with two decimals, e.g. `"12.34"`.
    pub size: String,
    pub size_bytes: i64,
    /// Creator's full name, else e-mail, else `"Система"`.
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}
