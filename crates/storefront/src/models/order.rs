//! Order domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vitrina_core::{OrderId, OrderItemId, Price, ProductId, UserId};

/// Shipping address submitted at checkout.
///
/// Every field is optional on the wire. A usable address needs a house or,
/// failing that, an apartment; the repository enforces this.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewAddress {
    #[serde(alias = "full_name")]
    pub full_name: Option<String>,
    #[serde(alias = "postal_code")]
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub street: Option<String>,
    pub house: Option<String>,
    pub apartment: Option<String>,
}

/// Checkout request as handed to [`crate::db::OrderRepository::create`].
///
/// `items` is kept as raw JSON: the SPA sends numbers, numeric strings and
/// extra fields (`price`, `name`), and the repository owns the coercion rules.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub address: NewAddress,
    pub delivery_method: Option<String>,
    pub payment_method: Option<String>,
    pub items: Vec<serde_json::Value>,
}

/// One normalized cart line: the snapshot the order is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    /// Always positive.
    pub quantity: i32,
}

/// A placed order with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// Status code, e.g. `new` or `shipped`.
    pub status: String,
    /// Human-readable status name.
    pub status_name: String,
    pub delivery_method: Option<String>,
    pub payment_method: Option<String>,
    pub total_amount: Price,
    /// Flattened display string, see `format_address`.
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// A line item. Product fields fall back to placeholders when the product
/// has since been deleted.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub photo: Option<String>,
    pub quantity: i32,
    /// Unit price at the time of purchase.
    pub price: Price,
    pub line_total: Price,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_address_accepts_both_casings() {
        let camel: NewAddress =
            serde_json::from_value(serde_json::json!({"postalCode": "101000", "house": "5"}))
                .unwrap();
        let snake: NewAddress =
            serde_json::from_value(serde_json::json!({"postal_code": "101000", "house": "5"}))
                .unwrap();
        assert_eq!(camel.postal_code.as_deref(), Some("101000"));
        assert_eq!(snake.postal_code.as_deref(), Some("101000"));
        assert_eq!(camel.apartment, None);
    }
}
