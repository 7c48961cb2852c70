//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use vitrina_core::{Email, Role, UserId};

/// A storefront account (domain type).
///
/// The password hash is never part of this type; repositories hand it out
/// separately and only to the auth service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// First and last name joined by a space, blank parts skipped.
    #[must_use]
    pub fn full_name(&self) -> String {
        join_name(&self.first_name, &self.last_name)
    }
}

/// Join name parts, skipping blanks. Returns an empty string if both are blank.
#[must_use]
pub fn join_name(first: &str, last: &str) -> String {
    [first.trim(), last.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Data for inserting a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

/// Profile fields a user may change about themselves.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    /// New Argon2 hash, already computed by the auth service.
    pub password_hash: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_name_skips_blanks() {
        assert_eq!(join_name("Анна", "Иванова"), "Анна Иванова");
        assert_eq!(join_name("  ", "Иванова"), "Иванова");
        assert_eq!(join_name("", ""), "");
    }
}
