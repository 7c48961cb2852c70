//! Backup commands.
//!
//! The same `BackupService` as the HTTP API, so files and metadata rows stay
//! consistent whichever side created them. Backups made here have no
//! creator and are listed as made by the system.

use thiserror::Error;

use vitrina_storefront::config::{BackupConfig, database_url_from_env};
use vitrina_storefront::services::{BackupError, BackupService};

use super::{CommandError, connect};

#[derive(Debug, Error)]
pub enum BackupCommandError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Backup(#[from] BackupError),
}

impl From<vitrina_storefront::config::ConfigError> for BackupCommandError {
    fn from(e: vitrina_storefront::config::ConfigError) -> Self {
        Self::Command(CommandError::Config(e))
    }
}

async fn service() -> Result<BackupService, BackupCommandError> {
    let pool = connect().await?;
    let config = BackupConfig::from_env(&database_url_from_env()?)?;
    Ok(BackupService::new(config, pool))
}

/// Dump the database.
pub async fn create() -> Result<(), BackupCommandError> {
    let backup = service().await?.create(None).await?;
    tracing::info!(
        "Backup created: {} ({} bytes) at {}",
        backup.filename,
        backup.size,
        backup.filepath
    );
    Ok(())
}

/// Print recorded backups, newest first.
pub async fn list() -> Result<(), BackupCommandError> {
    let backups = service().await?.list().await?;
    if backups.is_empty() {
        tracing::info!("No backups recorded");
        return Ok(());
    }

    for backup in backups {
        tracing::info!(
            "{}  {} KB  {}  {}",
            backup.filename,
            backup.size,
            backup.created_at.format("%Y-%m-%d %H:%M:%S"),
            backup.created_by
        );
    }
    Ok(())
}

/// Replay a dump into the database.
pub async fn restore(filename: &str) -> Result<(), BackupCommandError> {
    tracing::warn!("Restoring {filename}: existing data will be overwritten");
    service().await?.restore(filename).await?;
    tracing::info!("Database restored from {filename}");
    Ok(())
}

/// Delete a dump and its row.
pub async fn delete(filename: &str) -> Result<(), BackupCommandError> {
    service().await?.delete(filename).await?;
    tracing::info!("Backup {filename} deleted");
    Ok(())
}

/// Delete dumps older than `days`, or the configured retention period.
pub async fn cleanup(days: Option<u32>) -> Result<(), BackupCommandError> {
    let service = service().await?;
    let days = days.unwrap_or_else(|| service.retention_days());
    let deleted = service.cleanup(days).await?;
    tracing::info!("Removed {deleted} backup file(s) older than {days} day(s)");
    Ok(())
}
