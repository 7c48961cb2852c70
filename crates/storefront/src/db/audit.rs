//! Audit log repository. Insert and read only.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use vitrina_core::{AuditLogId, AuditSeverity, UserId};

use super::RepositoryError;
use crate::models::{AuditLogEntry, NewAuditEntry};

#[derive(sqlx::FromRow)]
struct AuditLogRow {
    id: AuditLogId,
    action: String,
    user_id: Option<UserId>,
    user_email: Option<String>,
    target_type: Option<String>,
    target_id: Option<i32>,
    old_values: Option<serde_json::Value>,
    new_values: Option<serde_json::Value>,
    severity: AuditSeverity,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<AuditLogRow> for AuditLogEntry {
    fn from(row: AuditLogRow) -> Self {
        Self {
            id: row.id,
            action: row.action,
            user_id: row.user_id,
            user_email: row.user_email,
            target_type: row.target_type,
            target_id: row.target_id,
            old_values: row.old_values,
            new_values: row.new_values,
            severity: row.severity,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: row.created_at,
        }
    }
}

/// Repository for the audit trail.
pub struct AuditRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AuditRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append one entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(&self, entry: &NewAuditEntry) -> Result<AuditLogId, RepositoryError> {
        let id = sqlx::query_scalar(
            r"
            INSERT INTO audit_logs
                (action, user_id, target_type, target_id, old_values, new_values,
                 severity, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            ",
        )
        .bind(&entry.action)
        .bind(entry.user_id)
        .bind(entry.target_type.as_deref())
        .bind(entry.target_id)
        .bind(entry.old_values.as_ref())
        .bind(entry.new_values.as_ref())
        .bind(entry.severity)
        .bind(entry.ip_address.as_deref())
        .bind(entry.user_agent.as_deref())
        .fetch_one(self.pool)
        .await?;
        Ok(id)
    }

    /// Entries newest first, with the acting user's e-mail when known.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            r"
            SELECT a.id, a.action, a.user_id, u.email AS user_email,
                   a.target_type, a.target_id, a.old_values, a.new_values,
                   a.severity, a.ip_address, a.user_agent, a.created_at
            FROM audit_logs a
            LEFT JOIN users u ON u.id = a.user_id
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(AuditLogEntry::from).collect())
    }
}
