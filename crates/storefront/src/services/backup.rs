//! Database backup and restore.
//!
//! Dumps are plain SQL files produced by `pg_dump` and replayed with `psql`.
//! Each successful dump gets a row in `backups`. The file and its row are
//! managed on a best-effort basis: deleting tolerates a missing file, and
//! retention cleanup works on the directory alone, so rows can outlive their
//! files.
//!
//! External tools are always started with an argument vector; filenames
//! never pass through a shell.

use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};
use regex::Regex;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use vitrina_core::UserId;

use crate::config::{BackupConfig, DbConnection};
use crate::db::backups::BackupListRow;
use crate::db::{BackupRepository, RepositoryError};
use crate::models::user::join_name;
use crate::models::{BackupRecord, BackupSummary};

const MAX_NAME_ATTEMPTS: u32 = 100;

/// Display name for backups without a known creator.
pub const SYSTEM_CREATOR: &str = "Система";

/// Bare dump filenames: no separators, no leading dot.
static BACKUP_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*\.sql$").expect("Invalid regex")
});

/// Errors that can occur during backup operations.
#[derive(Debug, Error)]
pub enum BackupError {
    /// `pg_dump` or `psql` could not be started or exited with an error.
    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    /// No such backup file.
    #[error("backup not found: {0}")]
    NotFound(String),

    /// Filename contains path components or is not a dump file.
    #[error("invalid backup filename: {0}")]
    InvalidFilename(String),

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Backup service.
///
/// Create, restore and cleanup run one at a time per process.
#[derive(Debug, Clone)]
pub struct BackupService {
    config: Arc<BackupConfig>,
    pool: PgPool,
    lock: Arc<Mutex<()>>,
}

impl BackupService {
    #[must_use]
    pub fn new(config: BackupConfig, pool: PgPool) -> Self {
        Self {
            config: Arc::new(config),
            pool,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Default retention for [`Self::cleanup`].
    #[must_use]
    pub fn retention_days(&self) -> u32 {
        self.config.retention_days
    }

    /// Dump the database into a new timestamped file and record it.
    ///
    /// The target file is reserved before `pg_dump` starts, so an existing
    /// dump is never overwritten. A second backup within the same second
    /// gets a numeric suffix.
    ///
    /// # Errors
    ///
    /// Returns `BackupError::ToolFailed` if `pg_dump` fails; no row is written
    /// and the partial file is removed in that case.
    #[instrument(skip(self))]
    pub async fn create(&self, created_by: Option<UserId>) -> Result<BackupRecord, BackupError> {
        let _guard = self.lock.lock().await;

        tokio::fs::create_dir_all(&self.config.dir).await?;

        let (filename, path) =
            reserve_file(&self.config.dir, &backup_filename(Local::now())).await?;

        let mut command = dump_command(&self.config.pg_dump, &self.config.connection, &path);
        if let Err(e) = run_tool(&self.config.pg_dump, &mut command).await {
            discard(&path).await;
            return Err(e);
        }

        let recorded = async {
            let size = tokio::fs::metadata(&path).await?.len();
            let size = i64::try_from(size).unwrap_or(i64::MAX);
            let record = BackupRepository::new(&self.pool)
                .insert(&filename, &path.to_string_lossy(), size, created_by)
                .await?;
            Ok::<_, BackupError>(record)
        }
        .await;

        match recorded {
            Ok(record) => {
                info!(filename = %record.filename, size = record.size, "backup created");
                Ok(record)
            }
            Err(e) => {
                discard(&path).await;
                Err(e)
            }
        }
    }

    /// All recorded backups, newest first.
    ///
    /// # Errors
    ///
    /// Returns `BackupError::Repository` if the query fails.
    pub async fn list(&self) -> Result<Vec<BackupSummary>, BackupError> {
        let rows = BackupRepository::new(&self.pool).list().await?;
        Ok(rows.into_iter().map(summarize).collect())
    }

    /// Resolve a backup file for download or restore.
    ///
    /// The path recorded in `backups` wins; names without a row are looked
    /// up in the backup directory.
    ///
    /// # Errors
    ///
    /// Returns `BackupError::InvalidFilename` for names with path components
    /// and `BackupError::NotFound` if the file does not exist.
    pub async fn locate(&self, filename: &str) -> Result<PathBuf, BackupError> {
        let path = self.resolve(filename).await?;

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(BackupError::NotFound(filename.to_owned())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BackupError::NotFound(filename.to_owned()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn resolve(&self, filename: &str) -> Result<PathBuf, BackupError> {
        validate_filename(filename)?;
        let stored = BackupRepository::new(&self.pool).find_path(filename).await?;
        Ok(resolve_path(&self.config.dir, filename, stored.as_deref()))
    }

    /// Replay a dump into the live database.
    ///
    /// Destructive: the dump drops and recreates the objects it contains.
    ///
    /// # Errors
    ///
    /// Returns `BackupError::NotFound` if the file is missing and
    /// `BackupError::ToolFailed` if `psql` fails.
    #[instrument(skip(self))]
    pub async fn restore(&self, filename: &str) -> Result<(), BackupError> {
        let _guard = self.lock.lock().await;

        let path = self.locate(filename).await?;
        let mut command = restore_command(&self.config.psql, &self.config.connection, &path);
        run_tool(&self.config.psql, &mut command).await?;

        info!(filename, "backup restored");
        Ok(())
    }

    /// Remove a backup file and its row.
    ///
    /// A file that cannot be removed is logged and skipped; the row is
    /// deleted regardless.
    ///
    /// # Errors
    ///
    /// Returns `BackupError::InvalidFilename` for names with path components
    /// and `BackupError::Repository` if the row cannot be deleted.
    #[instrument(skip(self))]
    pub async fn delete(&self, filename: &str) -> Result<(), BackupError> {
        let path = self.resolve(filename).await?;

        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "could not remove backup file");
        }

        let existed = BackupRepository::new(&self.pool)
            .delete_by_filename(filename)
            .await?;
        info!(filename, existed, "backup deleted");
        Ok(())
    }

    /// Delete dump files older than `retention_days`. Returns the number of
    /// files removed. Rows in `backups` are not touched.
    ///
    /// # Errors
    ///
    /// Returns `BackupError::Io` if the directory cannot be read.
    #[instrument(skip(self))]
    pub async fn cleanup(&self, retention_days: u32) -> Result<usize, BackupError> {
        let _guard = self.lock.lock().await;

        let threshold = SystemTime::now()
            .checked_sub(Duration::from_secs(u64::from(retention_days) * 24 * 60 * 60))
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut entries = match tokio::fs::read_dir(&self.config.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut deleted = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "sql") {
                continue;
            }

            let meta = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta,
                Ok(_) => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not stat backup file");
                    continue;
                }
            };

            let Ok(born) = meta.created().or_else(|_| meta.modified()) else {
                continue;
            };
            if born >= threshold {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => deleted += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "could not remove old backup"),
            }
        }

        info!(deleted, retention_days, "backup cleanup finished");
        Ok(deleted)
    }
}

/// `backup_2026-03-01_14-05-09.sql`
#[must_use]
pub fn backup_filename(now: DateTime<Local>) -> String {
    format!("backup_{}.sql", now.format("%Y-%m-%d_%H-%M-%S"))
}

/// Create `name` in `dir` exclusively, falling back to `name_1.sql`,
/// `name_2.sql` and so on when it is taken.
async fn reserve_file(dir: &Path, name: &str) -> Result<(String, PathBuf), BackupError> {
    let stem = name.strip_suffix(".sql").unwrap_or(name);
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = if attempt == 0 {
            name.to_owned()
        } else {
            format!("{stem}_{attempt}.sql")
        };
        let path = dir.join(&candidate);
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(_) => return Ok((candidate, path)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        format!("no free backup filename for {name}"),
    )
    .into())
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "could not remove unrecorded backup file");
    }
}

/// Where a backup lives: the recorded path when it names the same file,
/// otherwise `dir/filename`.
///
/// Recorded paths with `..` components or a different file name are
/// ignored.
#[must_use]
pub fn resolve_path(dir: &Path, filename: &str, stored: Option<&str>) -> PathBuf {
    stored
        .map(Path::new)
        .filter(|p| p.file_name().is_some_and(|name| name == filename))
        .filter(|p| !p.components().any(|c| matches!(c, Component::ParentDir)))
        .map_or_else(|| dir.join(filename), Path::to_path_buf)
}

/// Accept bare `.sql` names only.
///
/// # Errors
///
/// Returns `BackupError::InvalidFilename` otherwise.
pub fn validate_filename(filename: &str) -> Result<(), BackupError> {
    if filename.contains("..") || !BACKUP_FILENAME.is_match(filename) {
        return Err(BackupError::InvalidFilename(filename.to_owned()));
    }
    Ok(())
}

/// Kilobytes with two decimals.
#[must_use]
pub fn format_size_kb(bytes: i64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let kb = bytes as f64 / 1024.0;
    format!("{kb:.2}")
}

fn summarize(row: BackupListRow) -> BackupSummary {
    let full_name = join_name(
        row.creator_first_name.as_deref().unwrap_or_default(),
        row.creator_last_name.as_deref().unwrap_or_default(),
    );
    let created_by = if !full_name.is_empty() {
        full_name
    } else {
        row.creator_email
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| SYSTEM_CREATOR.to_owned())
    };

    BackupSummary {
        backup_id: row.id,
        filename: row.filename,
        filepath: row.filepath,
        size: format_size_kb(row.size_bytes),
        size_bytes: row.size_bytes,
        created_by,
        created_at: row.created_at,
    }
}

fn dump_command(program: &str, conn: &DbConnection, path: &Path) -> Command {
    let mut command = Command::new(program);
    connection_args(&mut command, conn);
    command
        .arg("-f")
        .arg(path)
        .arg("--clean")
        .arg("--if-exists");
    command
}

fn restore_command(program: &str, conn: &DbConnection, path: &Path) -> Command {
    let mut command = Command::new(program);
    connection_args(&mut command, conn);
    command
        .args(["-v", "ON_ERROR_STOP=1", "--single-transaction"])
        .arg("-f")
        .arg(path);
    command
}

fn connection_args(command: &mut Command, conn: &DbConnection) {
    command
        .arg("-h")
        .arg(&conn.host)
        .arg("-p")
        .arg(conn.port.to_string())
        .arg("-U")
        .arg(&conn.user)
        .arg("-d")
        .arg(&conn.database)
        .env("PGPASSWORD", conn.password.expose_secret())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
}

async fn run_tool(tool: &str, command: &mut Command) -> Result<(), BackupError> {
    let output = command.output().await.map_err(|e| BackupError::ToolFailed {
        tool: tool.to_owned(),
        message: e.to_string(),
    })?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let message = if stderr.trim().is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr.trim().to_owned()
    };
    warn!(tool, %message, "external tool failed");
    Err(BackupError::ToolFailed {
        tool: tool.to_owned(),
        message,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::ffi::OsStr;

    use chrono::{TimeZone, Utc};
    use secrecy::SecretString;
    use vitrina_core::BackupId;

    use super::*;

    fn connection() -> DbConnection {
        DbConnection {
            host: "db.internal".to_owned(),
            port: 6543,
            user: "shop".to_owned(),
            password: SecretString::from("hunter2".to_owned()),
            database: "vitrina".to_owned(),
        }
    }

    fn args(command: &Command) -> Vec<String> {
        command
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn row(first: Option<&str>, last: Option<&str>, email: Option<&str>) -> BackupListRow {
        BackupListRow {
            id: BackupId::new(1),
            filename: "backup_2026-03-01_14-05-09.sql".to_owned(),
            filepath: "backups/backup_2026-03-01_14-05-09.sql".to_owned(),
            size_bytes: 2048,
            created_at: Utc::now(),
            creator_first_name: first.map(str::to_owned),
            creator_last_name: last.map(str::to_owned),
            creator_email: email.map(str::to_owned),
        }
    }

    #[test]
    fn test_backup_filename_format() {
        let at = Local.with_ymd_and_hms(2026, 3, 1, 14, 5, 9).unwrap();
        assert_eq!(backup_filename(at), "backup_2026-03-01_14-05-09.sql");
    }

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("backup_2026-03-01_14-05-09.sql").is_ok());
        assert!(validate_filename("../etc/passwd.sql").is_err());
        assert!(validate_filename("a/b.sql").is_err());
        assert!(validate_filename("a\\b.sql").is_err());
        assert!(validate_filename("x..sql").is_err());
        assert!(validate_filename(".hidden.sql").is_err());
        assert!(validate_filename("backup.sql; rm -rf /").is_err());
        assert!(validate_filename("backup.txt").is_err());
        assert!(validate_filename("").is_err());
    }

    #[test]
    fn test_format_size_kb() {
        assert_eq!(format_size_kb(2048), "2.00");
        assert_eq!(format_size_kb(1536), "1.50");
        assert_eq!(format_size_kb(1), "0.00");
        assert_eq!(format_size_kb(12_641), "12.34");
    }

    #[test]
    fn test_creator_display_name() {
        assert_eq!(
            summarize(row(Some("Анна"), Some("Петрова"), Some("a@x.ru"))).created_by,
            "Анна Петрова"
        );
        assert_eq!(summarize(row(Some(" "), Some(""), Some("a@x.ru"))).created_by, "a@x.ru");
        assert_eq!(summarize(row(None, None, None)).created_by, SYSTEM_CREATOR);
    }

    #[test]
    fn test_summary_formats_size() {
        let summary = summarize(row(None, None, None));
        assert_eq!(summary.size, "2.00");
        assert_eq!(summary.size_bytes, 2048);
    }

    #[test]
    fn test_dump_command_uses_argument_vector() {
        let command = dump_command("pg_dump", &connection(), Path::new("/srv/b/x.sql"));

        assert_eq!(command.as_std().get_program(), OsStr::new("pg_dump"));
        assert_eq!(
            args(&command),
            vec![
                "-h", "db.internal", "-p", "6543", "-U", "shop", "-d", "vitrina", "-f",
                "/srv/b/x.sql", "--clean", "--if-exists",
            ]
        );
        let password = command
            .as_std()
            .get_envs()
            .find(|(k, _)| *k == OsStr::new("PGPASSWORD"))
            .and_then(|(_, v)| v);
        assert_eq!(password, Some(OsStr::new("hunter2")));
        assert!(!args(&command).iter().any(|a| a.contains("hunter2")));
    }

    #[test]
    fn test_restore_command_stops_on_error() {
        let command = restore_command("psql", &connection(), Path::new("/srv/b/x.sql"));
        assert_eq!(
            args(&command),
            vec![
                "-h", "db.internal", "-p", "6543", "-U", "shop", "-d", "vitrina", "-v",
                "ON_ERROR_STOP=1", "--single-transaction", "-f", "/srv/b/x.sql",
            ]
        );
    }

    #[tokio::test]
    async fn test_reserve_file_never_reuses_a_name() {
        let dir = std::env::temp_dir().join(format!("vitrina-reserve-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let name = "backup_2026-03-01_14-05-09.sql";

        let (first, first_path) = reserve_file(&dir, name).await.unwrap();
        tokio::fs::write(&first_path, b"-- first dump").await.unwrap();
        let (second, second_path) = reserve_file(&dir, name).await.unwrap();
        let (third, _) = reserve_file(&dir, name).await.unwrap();

        assert_eq!(first, name);
        assert_eq!(second, "backup_2026-03-01_14-05-09_1.sql");
        assert_eq!(third, "backup_2026-03-01_14-05-09_2.sql");
        assert!(validate_filename(&second).is_ok());
        assert_eq!(tokio::fs::read(&first_path).await.unwrap(), b"-- first dump");
        assert!(tokio::fs::read(&second_path).await.unwrap().is_empty());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[test]
    fn test_resolve_path_prefers_recorded_path() {
        let dir = Path::new("/var/lib/vitrina/backups");
        let name = "backup_2026-03-01_14-05-09.sql";

        assert_eq!(
            resolve_path(dir, name, Some("/srv/old-backups/backup_2026-03-01_14-05-09.sql")),
            PathBuf::from("/srv/old-backups/backup_2026-03-01_14-05-09.sql")
        );
        assert_eq!(resolve_path(dir, name, None), dir.join(name));
        assert_eq!(resolve_path(dir, name, Some("/etc/passwd")), dir.join(name));
        assert_eq!(
            resolve_path(dir, name, Some("/srv/../etc/backup_2026-03-01_14-05-09.sql")),
            dir.join(name)
        );
    }

    #[tokio::test]
    async fn test_run_tool_reports_missing_program() {
        let mut command = Command::new("vitrina-no-such-tool");
        let err = run_tool("vitrina-no-such-tool", &mut command).await.unwrap_err();
        assert!(matches!(err, BackupError::ToolFailed { ref tool, .. } if tool == "vitrina-no-such-tool"));
    }
}
