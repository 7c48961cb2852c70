//! Product repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use vitrina_core::{CategoryId, ManufacturerId, Price, ProductId};

use super::RepositoryError;
use crate::models::{Product, ProductInput};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: Option<String>,
    price: Decimal,
    stock: i32,
    photo: Option<String>,
    category_id: Option<CategoryId>,
    category_name: Option<String>,
    manufacturer_id: Option<ManufacturerId>,
    manufacturer_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("product {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price,
            stock: row.stock,
            photo: row.photo,
            category_id: row.category_id,
            category_name: row.category_name,
            manufacturer_id: row.manufacturer_id,
            manufacturer_name: row.manufacturer_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const PRODUCT_SELECT: &str = r"
    SELECT p.id, p.name, p.description, p.price, p.stock, p.photo,
           p.category_id, c.name AS category_name,
           p.manufacturer_id, m.name AS manufacturer_name,
           p.created_at, p.updated_at
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN manufacturers m ON m.id = p.manufacturer_id
";

const UNKNOWN_REFERENCE: &str = "category or manufacturer does not exist";

/// Repository for catalog products.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All products, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} ORDER BY p.name, p.id"))
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    /// Fetch several products at once. Unknown IDs are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} WHERE p.id = ANY($1)"))
            .bind(ids)
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` if the category or
    /// manufacturer does not exist.
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let id: ProductId = sqlx::query_scalar(
            r"
            INSERT INTO products
                (name, description, price, stock, photo, category_id, manufacturer_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            ",
        )
        .bind(input.name.trim())
        .bind(input.description.as_deref())
        .bind(input.price)
        .bind(input.stock)
        .bind(input.photo.as_deref())
        .bind(input.category_id)
        .bind(input.manufacturer_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product already exists", UNKNOWN_REFERENCE))?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Replace all editable fields of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::InvalidReference` for unknown references.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE products
            SET name = $2, description = $3, price = $4, stock = $5, photo = $6,
                category_id = $7, manufacturer_id = $8, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(input.description.as_deref())
        .bind(input.price)
        .bind(input.stock)
        .bind(input.photo.as_deref())
        .bind(input.category_id)
        .bind(input.manufacturer_id)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product already exists", UNKNOWN_REFERENCE))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a product. Order items keep their snapshot and lose the link.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
