//! Catalog domain types: products, categories and manufacturers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vitrina_core::{CategoryId, ManufacturerId, Price, ProductId};

/// A product as shown in the catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub stock: i32,
    pub photo: Option<String>,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub manufacturer_id: Option<ManufacturerId>,
    pub manufacturer_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating or replacing a product.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub manufacturer_id: Option<ManufacturerId>,
}

impl ProductInput {
    /// Check field constraints before touching the database.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message for the first violated constraint.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".to_owned());
        }
        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err("price cannot be negative".to_owned());
        }
        if self.stock < 0 {
            return Err("stock cannot be negative".to_owned());
        }
        Ok(())
    }
}

/// A product category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating or replacing a category.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A product manufacturer.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Manufacturer {
    pub id: ManufacturerId,
    pub name: String,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating or replacing a manufacturer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManufacturerInput {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(json: serde_json::Value) -> ProductInput {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_product_input_accepts_camel_case() {
        let product = input(serde_json::json!({
            "name": "Чайник",
            "price": "1499.00",
            "stock": 3,
            "categoryId": 2,
            "manufacturerId": 7
        }));
        assert_eq!(product.category_id, Some(CategoryId::new(2)));
        assert_eq!(product.manufacturer_id, Some(ManufacturerId::new(7)));
        assert!(product.validate().is_ok());
    }

    #[test]
    fn test_product_input_accepts_numeric_price() {
        let product = input(serde_json::json!({"name": "Лампа", "price": 250}));
        assert_eq!(product.price, Decimal::from(250));
        assert_eq!(product.stock, 0);
    }

    #[test]
    fn test_product_input_validation() {
        let blank = input(serde_json::json!({"name": "  ", "price": 1}));
        assert_eq!(blank.validate().unwrap_err(), "name is required");

        let negative = input(serde_json::json!({"name": "x", "price": -1}));
        assert!(negative.validate().is_err());

        let stock = input(serde_json::json!({"name": "x", "price": 1, "stock": -2}));
        assert_eq!(stock.validate().unwrap_err(), "stock cannot be negative");
    }
}
