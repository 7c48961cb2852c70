//! User management commands.

use thiserror::Error;

use vitrina_core::{Email, Role};
use vitrina_storefront::db::{RepositoryError, UserRepository};
use vitrina_storefront::services::AuthError;
use vitrina_storefront::services::auth::{AuthService, Registration};

use super::{CommandError, connect};

#[derive(Debug, Error)]
pub enum UserCommandError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Invalid role: {0}. Valid roles: client, manager, admin")]
    InvalidRole(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("No user with email: {0}")]
    UserNotFound(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn parse_role(role: &str) -> Result<Role, UserCommandError> {
    role.parse()
        .map_err(|_| UserCommandError::InvalidRole(role.to_owned()))
}

/// Create a user with the given role.
pub async fn create(
    email: &str,
    password: &str,
    role: &str,
    first_name: String,
    last_name: String,
) -> Result<(), UserCommandError> {
    let role = parse_role(role)?;
    let pool = connect().await?;

    let form = Registration {
        email: email.to_owned(),
        password: password.to_owned(),
        first_name,
        last_name,
        phone: None,
    };
    let user = AuthService::new(&pool).create_user(&form, role).await?;

    tracing::info!(
        "User created! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(())
}

/// Change the role of an existing user.
pub async fn set_role(email: &str, role: &str) -> Result<(), UserCommandError> {
    let role = parse_role(role)?;
    let parsed = Email::parse(email).map_err(|_| UserCommandError::InvalidEmail(email.to_owned()))?;
    let pool = connect().await?;

    let repo = UserRepository::new(&pool);
    let user = repo
        .get_by_email(&parsed)
        .await?
        .ok_or_else(|| UserCommandError::UserNotFound(email.to_owned()))?;
    let (previous, user) = repo.set_role(user.id, role).await?;

    tracing::info!("Role of {} changed: {} -> {}", user.email, previous, user.role);
    Ok(())
}

/// Re-hash every stored plaintext password.
pub async fn migrate_passwords() -> Result<(), UserCommandError> {
    let pool = connect().await?;
    let migrated = AuthService::new(&pool).migrate_legacy_passwords().await?;
    tracing::info!("Re-hashed {migrated} legacy password(s)");
    Ok(())
}
