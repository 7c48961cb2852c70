//! Backup metadata repository.
//!
//! Rows describe dump files on disk. The two can drift apart: files may be
//! removed by cleanup while their row stays.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use vitrina_core::{BackupId, UserId};

use super::RepositoryError;
use crate::models::BackupRecord;

/// A metadata row joined with its creator.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BackupListRow {
    pub id: BackupId,
    pub filename: String,
    pub filepath: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
    pub creator_first_name: Option<String>,
    pub creator_last_name: Option<String>,
    pub creator_email: Option<String>,
}

/// Repository for backup metadata.
pub struct BackupRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BackupRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a finished dump.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a row with this filename exists.
    pub async fn insert(
        &self,
        filename: &str,
        filepath: &str,
        size_bytes: i64,
        created_by: Option<UserId>,
    ) -> Result<BackupRecord, RepositoryError> {
        let (backup_id, created_at): (BackupId, DateTime<Utc>) = sqlx::query_as(
            r"
            INSERT INTO backups (filename, filepath, size_bytes, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, created_at
            ",
        )
        .bind(filename)
        .bind(filepath)
        .bind(size_bytes)
        .bind(created_by)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "backup already recorded", "creator does not exist"))?;

        Ok(BackupRecord {
            backup_id,
            filename: filename.to_owned(),
            filepath: filepath.to_owned(),
            size: size_bytes,
            created_at,
        })
    }

    /// All rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<BackupListRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, BackupListRow>(
            r"
            SELECT b.id, b.filename, b.filepath, b.size_bytes, b.created_at,
                   u.first_name AS creator_first_name,
                   u.last_name AS creator_last_name,
                   u.email AS creator_email
            FROM backups b
            LEFT JOIN users u ON u.id = b.created_by
            ORDER BY b.created_at DESC, b.id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Stored path of a backup, if a row exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_path(&self, filename: &str) -> Result<Option<String>, RepositoryError> {
        let path = sqlx::query_scalar("SELECT filepath FROM backups WHERE filename = $1")
            .bind(filename)
            .fetch_optional(self.pool)
            .await?;
        Ok(path)
    }

    /// Remove the row for `filename`. Returns whether a row existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_by_filename(&self, filename: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM backups WHERE filename = $1")
            .bind(filename)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
