//! Subcommand implementations.

pub mod backup;
pub mod migrate;
pub mod users;

use sqlx::PgPool;
use thiserror::Error;

use vitrina_storefront::config::{ConfigError, database_url_from_env};
use vitrina_storefront::db::create_pool;

/// Errors shared by all subcommands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Load `.env` and connect to the configured database.
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = database_url_from_env()?;
    tracing::info!("Connecting to database...");
    Ok(create_pool(&database_url).await?)
}
