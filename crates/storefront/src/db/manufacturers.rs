//! Manufacturer repository.

use sqlx::PgPool;

use vitrina_core::ManufacturerId;

use super::RepositoryError;
use crate::models::{Manufacturer, ManufacturerInput};

const DUPLICATE: &str = "manufacturer with this name already exists";

/// Repository for product manufacturers.
pub struct ManufacturerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ManufacturerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All manufacturers, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Manufacturer>, RepositoryError> {
        let rows = sqlx::query_as::<_, Manufacturer>(
            "SELECT id, name, country, created_at FROM manufacturers ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ManufacturerId) -> Result<Option<Manufacturer>, RepositoryError> {
        let row = sqlx::query_as::<_, Manufacturer>(
            "SELECT id, name, country, created_at FROM manufacturers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create(&self, input: &ManufacturerInput) -> Result<Manufacturer, RepositoryError> {
        sqlx::query_as::<_, Manufacturer>(
            r"
            INSERT INTO manufacturers (name, country)
            VALUES ($1, $2)
            RETURNING id, name, country, created_at
            ",
        )
        .bind(input.name.trim())
        .bind(input.country.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, DUPLICATE, DUPLICATE))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the manufacturer does not exist.
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn update(
        &self,
        id: ManufacturerId,
        input: &ManufacturerInput,
    ) -> Result<Manufacturer, RepositoryError> {
        sqlx::query_as::<_, Manufacturer>(
            r"
            UPDATE manufacturers SET name = $2, country = $3
            WHERE id = $1
            RETURNING id, name, country, created_at
            ",
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(input.country.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, DUPLICATE, DUPLICATE))?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the manufacturer does not exist.
    pub async fn delete(&self, id: ManufacturerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM manufacturers WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
