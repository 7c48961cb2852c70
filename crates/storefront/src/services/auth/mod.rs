//! Authentication service.
//!
//! Password accounts with Argon2id hashes and bearer JWT access tokens.
//!
//! Accounts imported from the previous system may still carry their password
//! in the clear. Such values are recognised by not being a PHC string; they
//! are compared in constant time and re-hashed on the first successful login
//! (or in bulk by `vitrina users migrate-passwords`).

mod error;
mod token;

pub use error::AuthError;
pub use token::{Claims, JwtKeys};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use tracing::{info, warn};

use vitrina_core::{Email, Role, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::{NewUser, ProfileUpdate, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration form.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

/// Profile change requested by the account owner.
#[derive(Debug, Clone, Default)]
pub struct ProfileChange {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    /// Required when `new_password` is set.
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

impl ProfileChange {
    #[must_use]
    pub const fn changes_password(&self) -> bool {
        self.new_password.is_some()
    }
}

/// Authentication service.
///
/// Handles registration, login, profile updates and legacy password migration.
pub struct AuthService<'a> {
    pool: &'a PgPool,
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            users: UserRepository::new(pool),
        }
    }

    /// Register a new client account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, form: &Registration) -> Result<User, AuthError> {
        self.create_user(form, Role::Client).await
    }

    /// Create an account with an explicit role. Used by the CLI.
    ///
    /// # Errors
    ///
    /// Same as [`Self::register`].
    pub async fn create_user(&self, form: &Registration, role: Role) -> Result<User, AuthError> {
        let email = Email::parse(&form.email)?;
        validate_password(&form.password)?;
        let password_hash = hash_password(&form.password)?;

        let new_user = NewUser {
            email,
            password_hash,
            first_name: form.first_name.trim().to_owned(),
            last_name: form.last_name.trim().to_owned(),
            phone: form
                .phone
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_owned),
        };

        self.users
            .create(&new_user, role)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, stored) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        match check_password(password, &stored)? {
            PasswordCheck::Valid => {}
            PasswordCheck::ValidLegacy => {
                // Login still succeeds if the upgrade write fails.
                match hash_password(password) {
                    Ok(hash) => match self.users.set_password_hash(user.id, &hash).await {
                        Ok(()) => info!(user_id = %user.id, "upgraded legacy password"),
                        Err(e) => warn!(user_id = %user.id, error = %e, "failed to upgrade legacy password"),
                    },
                    Err(e) => warn!(user_id = %user.id, error = %e, "failed to hash legacy password"),
                }
            }
        }

        Ok(user)
    }

    /// Update the caller's own profile in one transaction.
    ///
    /// Changing the password requires the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the current password is wrong
    /// or missing, `AuthError::WeakPassword` for a short new password and
    /// `AuthError::UserNotFound` if the account is gone.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        change: &ProfileChange,
    ) -> Result<User, AuthError> {
        let password_hash = match change.new_password.as_deref() {
            Some(new_password) => {
                validate_password(new_password)?;
                Some(hash_password(new_password)?)
            }
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        if password_hash.is_some() {
            let stored = UserRepository::lock_password_hash(&mut tx, user_id)
                .await
                .map_err(not_found_as_user)?;
            let current = change
                .current_password
                .as_deref()
                .ok_or(AuthError::InvalidCredentials)?;
            check_password(current, &stored)?;
        }

        let update = ProfileUpdate {
            first_name: change.first_name.as_deref().map(|s| s.trim().to_owned()),
            last_name: change.last_name.as_deref().map(|s| s.trim().to_owned()),
            phone: change.phone.as_deref().map(|s| s.trim().to_owned()),
            password_hash,
        };

        let user = UserRepository::update_profile(&mut tx, user_id, &update)
            .await
            .map_err(not_found_as_user)?;

        tx.commit().await?;
        Ok(user)
    }

    /// Re-hash every stored password that is not a PHC string yet.
    ///
    /// Returns the number of accounts upgraded.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn migrate_legacy_passwords(&self) -> Result<usize, AuthError> {
        let legacy = self.users.legacy_passwords().await?;
        let mut upgraded = 0;

        for (user_id, plaintext) in legacy {
            if plaintext.is_empty() {
                warn!(user_id = %user_id, "skipping account with empty password");
                continue;
            }
            let hash = hash_password(&plaintext)?;
            self.users.set_password_hash(user_id, &hash).await?;
            upgraded += 1;
        }

        Ok(upgraded)
    }
}

fn not_found_as_user(e: RepositoryError) -> AuthError {
    match e {
        RepositoryError::NotFound => AuthError::UserNotFound,
        other => AuthError::Repository(other),
    }
}

/// Outcome of a successful password check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    /// Matched an Argon2 hash.
    Valid,
    /// Matched a legacy stored value that should be re-hashed.
    ValidLegacy,
}

/// Whether a stored value is a legacy (non-PHC) password.
#[must_use]
pub fn is_legacy_password(stored: &str) -> bool {
    PasswordHash::new(stored).is_err()
}

/// Check a password against the stored value.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch.
pub fn check_password(password: &str, stored: &str) -> Result<PasswordCheck, AuthError> {
    if is_legacy_password(stored) {
        if !stored.is_empty() && constant_time_compare(password, stored) {
            return Ok(PasswordCheck::ValidLegacy);
        }
        return Err(AuthError::InvalidCredentials);
    }

    verify_password(password, stored)?;
    Ok(PasswordCheck::Valid)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_check() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!is_legacy_password(&hash));
        assert_eq!(
            check_password("correct horse", &hash).unwrap(),
            PasswordCheck::Valid
        );
        assert!(matches!(
            check_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_legacy_plaintext_matches() {
        assert!(is_legacy_password("secret123"));
        assert_eq!(
            check_password("secret123", "secret123").unwrap(),
            PasswordCheck::ValidLegacy
        );
        assert!(check_password("secret124", "secret123").is_err());
        assert!(check_password("secret12", "secret123").is_err());
    }

    #[test]
    fn test_empty_legacy_value_never_matches() {
        assert!(check_password("", "").is_err());
    }

    #[test]
    fn test_validate_password_counts_characters() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("длинный1").is_ok());
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(constant_time_compare("", ""));
        assert!(!constant_time_compare("hello", "hellO"));
        assert!(!constant_time_compare("hello", "hello!"));
    }

    #[test]
    fn test_profile_change_password_flag() {
        let change = ProfileChange {
            new_password: Some("new-password".to_owned()),
            ..ProfileChange::default()
        };
        assert!(change.changes_password());
        assert!(!ProfileChange::default().changes_password());
    }
}
