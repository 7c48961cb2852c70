//! User repository for database operations.
//!
//! Accounts live in `users`; the role is a row in `user_roles` pointing at
//! `roles`. Writes that touch both tables run in one transaction.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use vitrina_core::{Email, Role, UserId};

use super::RepositoryError;
use crate::models::{NewUser, ProfileUpdate, User};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let role = row.role.parse::<Role>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid role in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// Users without a user_roles row are treated as clients.
const USER_SELECT: &str = r"
    SELECT u.id, u.email, u.first_name, u.last_name, u.phone,
           COALESCE(r.name, 'client') AS role,
           u.created_at, u.updated_at
    FROM users u
    LEFT JOIN user_roles ur ON ur.user_id = u.id
    LEFT JOIN roles r ON r.id = ur.role_id
";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        get_by_id(self.pool, id).await
    }

    /// Get a user by their email address.
    ///
    /// Matching ignores case so rows stored before emails were normalized
    /// are still found.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "{USER_SELECT} WHERE lower(u.email) = lower($1) ORDER BY u.id LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user together with the stored password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHashRow>(&format!(
            r"
            SELECT sub.*, u.password_hash
            FROM ({USER_SELECT}) sub
            JOIN users u ON u.id = sub.id
            WHERE lower(u.email) = lower($1)
            ORDER BY u.id
            LIMIT 1
            "
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| Ok((User::try_from(r.user)?, r.password_hash)))
            .transpose()
    }

    /// All users, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(&format!("{USER_SELECT} ORDER BY u.id"))
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    /// Create a user and assign a role in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::DataCorruption` if the role row is missing.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new_user: &NewUser, role: Role) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let user_id: UserId = sqlx::query_scalar(
            r"
            INSERT INTO users (email, password_hash, first_name, last_name, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(new_user.phone.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        assign_role(&mut tx, user_id, role).await?;
        let user = get_by_id(&mut *tx, user_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(user)
    }

    /// Change the role of an existing user. Returns `(previous_role, user)`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_role(&self, id: UserId, role: Role) -> Result<(Role, User), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Lock the user row so concurrent role changes serialize.
        let locked: Option<UserId> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let previous = get_by_id(&mut *tx, id)
            .await?
            .ok_or(RepositoryError::NotFound)?
            .role;
        assign_role(&mut tx, id, role).await?;
        let user = get_by_id(&mut *tx, id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok((previous, user))
    }

    /// Replace the stored password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_password_hash(&self, id: UserId, hash: &str) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(hash)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Users whose stored password is not an Argon2 hash yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn legacy_passwords(&self) -> Result<Vec<(UserId, String)>, RepositoryError> {
        let rows = sqlx::query_as::<_, (UserId, String)>(
            "SELECT id, password_hash FROM users WHERE password_hash NOT LIKE '$argon2%' ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Delete a user who has never placed an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user has orders.
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let has_orders: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE user_id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;
        if has_orders {
            return Err(RepositoryError::Conflict("user has orders".to_owned()));
        }

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "user has orders", "user has orders"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Transaction Helpers
    // =========================================================================

    /// Lock a user row and return its password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn lock_password_hash(
        conn: &mut PgConnection,
        id: UserId,
    ) -> Result<String, RepositoryError> {
        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(conn)
                .await?;
        hash.ok_or(RepositoryError::NotFound)
    }

    /// Apply a profile update inside the caller's transaction.
    ///
    /// Fields left as `None` keep their current value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update_profile(
        conn: &mut PgConnection,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone = COALESCE($4, phone),
                password_hash = COALESCE($5, password_hash),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(update.first_name.as_deref())
        .bind(update.last_name.as_deref())
        .bind(update.phone.as_deref())
        .bind(update.password_hash.as_deref())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        get_by_id(&mut *conn, id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }
}

async fn get_by_id<'e, E>(executor: E, id: UserId) -> Result<Option<User>, RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, UserRow>(&format!("{USER_SELECT} WHERE u.id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    row.map(User::try_from).transpose()
}

async fn assign_role(
    conn: &mut PgConnection,
    user_id: UserId,
    role: Role,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        INSERT INTO user_roles (user_id, role_id)
        SELECT $1, r.id FROM roles r WHERE r.name = $2
        ON CONFLICT (user_id) DO UPDATE SET role_id = EXCLUDED.role_id
        ",
    )
    .bind(user_id)
    .bind(role)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::DataCorruption(format!(
            "role '{role}' is missing from the roles table"
        )));
    }
    Ok(())
}
