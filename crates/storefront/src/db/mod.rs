//! Database operations for the storefront `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `roles`, `users`, `user_roles` - Accounts (one role per user)
//! - `categories`, `manufacturers`, `products` - Catalog
//! - `addresses`, `order_statuses`, `orders`, `order_items` - Checkout
//! - `payments` - One payment per order
//! - `audit_logs` - Append-only audit trail
//! - `backups` - Metadata for dump files on disk
//! - `tower_sessions.session` - Cart sessions (created by the session store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p vitrina-cli -- migrate
//! ```

pub mod audit;
pub mod backups;
pub mod categories;
pub mod manufacturers;
pub mod orders;
pub mod payments;
pub mod products;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use audit::AuditRepository;
pub use backups::BackupRepository;
pub use categories::CategoryRepository;
pub use manufacturers::ManufacturerRepository;
pub use orders::{OrderError, OrderRepository};
pub use payments::PaymentRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A foreign key points at a row that does not exist.
    #[error("invalid reference: {0}")]
    InvalidReference(String),
}

impl RepositoryError {
    /// Classify constraint violations on writes.
    ///
    /// Unique violations become `Conflict`, foreign key violations become
    /// `InvalidReference`; anything else stays a database error.
    pub(crate) fn from_write(e: sqlx::Error, conflict: &str, reference: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return Self::Conflict(conflict.to_owned());
            }
            if db_err.is_foreign_key_violation() {
                return Self::InvalidReference(reference.to_owned());
            }
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
