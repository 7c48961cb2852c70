//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::{AuditLogger, BackupService, JwtKeys};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    jwt: JwtKeys,
    audit: AuditLogger,
    backups: BackupService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Starts the audit writer task, so this must run inside a Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let jwt = JwtKeys::new(&config.jwt);
        let (audit, _writer) = AuditLogger::spawn(pool.clone(), config.audit_queue_capacity);
        let backups = BackupService::new(config.backup.clone(), pool.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                jwt,
                audit,
                backups,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Access-token keys.
    #[must_use]
    pub fn jwt(&self) -> &JwtKeys {
        &self.inner.jwt
    }

    /// Audit queue handle.
    #[must_use]
    pub fn audit(&self) -> &AuditLogger {
        &self.inner.audit
    }

    /// Backup service.
    #[must_use]
    pub fn backups(&self) -> &BackupService {
        &self.inner.backups
    }
}
