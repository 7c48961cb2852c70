//! Order repository: transactional checkout and order history.
//!
//! # Checkout
//!
//! [`OrderRepository::create`] runs the whole checkout in one transaction:
//! user check, address insert, item normalization, order and line-item
//! creation with stock decrement, then the free-text delivery/payment
//! fields. Any error drops the transaction, which rolls everything back.
//!
//! # History
//!
//! Orders are loaded with one query and their line items with a second,
//! batched over the whole id set.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use tracing::instrument;

use vitrina_core::{AddressId, OrderId, OrderItemId, Price, ProductId, UserId};

use crate::models::{NewAddress, NewOrder, Order, OrderItem, OrderLine};

/// Status assigned to freshly created orders.
pub const INITIAL_STATUS: &str = "new";

/// Shown instead of the product name when the product was deleted.
pub const DELETED_PRODUCT_NAME: &str = "Товар удалён";

/// Shown instead of the product photo when the product was deleted.
pub const DELETED_PRODUCT_PHOTO: &str = "/images/product-deleted.png";

/// Errors from order creation and status changes.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("address must include a house or an apartment")]
    InvalidAddress,

    #[error("invalid item at position {index}: {reason}")]
    InvalidItem { index: usize, reason: String },

    #[error("order must contain at least one item")]
    EmptyOrder,

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("insufficient stock for product {0}")]
    InsufficientStock(ProductId),

    #[error("unknown order status: {0}")]
    UnknownStatus(String),

    #[error("order not found")]
    NotFound,

    #[error("data corruption: {0}")]
    DataCorruption(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =============================================================================
// Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    status_code: String,
    status_name: String,
    delivery_method: Option<String>,
    payment_method: Option<String>,
    total_amount: Decimal,
    created_at: DateTime<Utc>,
    full_name: Option<String>,
    postal_code: Option<String>,
    city: Option<String>,
    street: Option<String>,
    house: String,
    apartment: Option<String>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: Option<ProductId>,
    quantity: i32,
    price: Decimal,
    product_name: Option<String>,
    product_photo: Option<String>,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = OrderError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price)
            .map_err(|e| OrderError::DataCorruption(format!("order item {}: {e}", row.id)))?;

        // product_id is nulled by ON DELETE SET NULL
        let (product_name, photo) = match row.product_id {
            Some(_) => (row.product_name.unwrap_or_default(), row.product_photo),
            None => (
                DELETED_PRODUCT_NAME.to_owned(),
                Some(DELETED_PRODUCT_PHOTO.to_owned()),
            ),
        };

        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            product_name,
            photo,
            quantity: row.quantity,
            price,
            line_total: price.line_total(row.quantity.unsigned_abs()),
        })
    }
}

const ORDER_SELECT: &str = r"
    SELECT o.id, o.user_id, s.code AS status_code, s.name AS status_name,
           o.delivery_method, o.payment_method, o.total_amount, o.created_at,
           a.full_name, a.postal_code, a.city, a.street, a.house, a.apartment
    FROM orders o
    JOIN order_statuses s ON s.id = o.status_id
    JOIN addresses a ON a.id = o.address_id
";

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order.
    ///
    /// Runs as a single transaction; nothing is persisted unless every step
    /// succeeds. No audit entry is written here.
    ///
    /// # Errors
    ///
    /// - `OrderError::UserNotFound` if the user does not exist
    /// - `OrderError::InvalidAddress` if neither house nor apartment is given
    /// - `OrderError::InvalidItem` if an item has a non-numeric `product_id`
    /// - `OrderError::EmptyOrder`, `ProductNotFound`, `InsufficientStock`
    ///   from [`create_order_with_items`]
    /// - `OrderError::Database` for anything else
    #[instrument(skip(self, order), fields(user_id = %order.user_id, items = order.items.len()))]
    pub async fn create(&self, order: &NewOrder) -> Result<OrderId, OrderError> {
        let mut tx = self.pool.begin().await?;

        let user_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(order.user_id)
                .fetch_one(&mut *tx)
                .await?;
        if !user_exists {
            return Err(OrderError::UserNotFound(order.user_id));
        }

        let house = resolve_house(&order.address)?;

        let address_id: AddressId = sqlx::query_scalar(
            r"
            INSERT INTO addresses (user_id, full_name, postal_code, city, street, house, apartment)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            ",
        )
        .bind(order.user_id)
        .bind(order.address.full_name.as_deref())
        .bind(order.address.postal_code.as_deref())
        .bind(order.address.city.as_deref())
        .bind(order.address.street.as_deref())
        .bind(house)
        .bind(order.address.apartment.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        let lines = normalize_items(&order.items)?;
        let order_id = create_order_with_items(&mut tx, order.user_id, address_id, &lines).await?;

        sqlx::query("UPDATE orders SET delivery_method = $2, payment_method = $3 WHERE id = $1")
            .bind(order_id)
            .bind(order.delivery_method.as_deref())
            .bind(order.payment_method.as_deref())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, "Order created");
        Ok(order_id)
    }

    /// All orders of one user, newest first, with their items.
    ///
    /// A user without orders gets an empty list.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Database` if a query fails.
    pub async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE o.user_id = $1 ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        self.with_items(rows).await
    }

    /// Every order in the store, newest first. Staff only.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Database` if a query fails.
    pub async fn find_all(&self) -> Result<Vec<Order>, OrderError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} ORDER BY o.created_at DESC, o.id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        self.with_items(rows).await
    }

    /// A single order with its items.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Database` if a query fails.
    pub async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, OrderError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(order_id)
            .fetch_optional(self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(self.with_items(vec![row]).await?.into_iter().next())
    }

    /// Owner of an order, for access checks.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Database` if the query fails.
    pub async fn owner(&self, order_id: OrderId) -> Result<Option<UserId>, OrderError> {
        let owner = sqlx::query_scalar("SELECT user_id FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(owner)
    }

    /// Move an order to another status. Returns the previous status code.
    ///
    /// # Errors
    ///
    /// - `OrderError::NotFound` if the order does not exist
    /// - `OrderError::UnknownStatus` if `status` is not a known status code
    /// - `OrderError::Database` if a query fails
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: &str,
    ) -> Result<String, OrderError> {
        let mut tx = self.pool.begin().await?;

        let previous: Option<String> = sqlx::query_scalar(
            r"
            SELECT s.code
            FROM orders o
            JOIN order_statuses s ON s.id = o.status_id
            WHERE o.id = $1
            FOR UPDATE OF o
            ",
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;
        let previous = previous.ok_or(OrderError::NotFound)?;

        let status_id: Option<i32> =
            sqlx::query_scalar("SELECT id FROM order_statuses WHERE code = $1")
                .bind(status)
                .fetch_optional(&mut *tx)
                .await?;
        let status_id = status_id.ok_or_else(|| OrderError::UnknownStatus(status.to_owned()))?;

        sqlx::query("UPDATE orders SET status_id = $2 WHERE id = $1")
            .bind(order_id)
            .bind(status_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(previous)
    }

    /// Attach line items to order rows with one batched query.
    async fn with_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, OrderError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<OrderId> = rows.iter().map(|row| row.id).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT oi.id, oi.order_id, oi.product_id, oi.quantity, oi.price,
                   p.name AS product_name, p.photo AS product_photo
            FROM order_items oi
            LEFT JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.order_id, oi.id
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut items: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let order_id = row.order_id;
            items
                .entry(order_id)
                .or_default()
                .push(OrderItem::try_from(row)?);
        }

        rows.into_iter()
            .map(|row| {
                let total_amount = Price::new(row.total_amount).map_err(|e| {
                    OrderError::DataCorruption(format!("order {}: {e}", row.id))
                })?;
                let address = format_address(
                    row.postal_code.as_deref(),
                    row.city.as_deref(),
                    row.street.as_deref(),
                    Some(&row.house),
                    row.apartment.as_deref(),
                    row.full_name.as_deref(),
                );
                Ok(Order {
                    id: row.id,
                    user_id: row.user_id,
                    status: row.status_code,
                    status_name: row.status_name,
                    delivery_method: row.delivery_method,
                    payment_method: row.payment_method,
                    total_amount,
                    address,
                    created_at: row.created_at,
                    items: items.remove(&row.id).unwrap_or_default(),
                })
            })
            .collect()
    }
}

// =============================================================================
// Order Creation
// =============================================================================

/// Create an order and its line items from a normalized cart snapshot.
///
/// Must run inside the caller's transaction. Lines are merged per product
/// and processed in ascending product id so concurrent checkouts lock the
/// product rows in the same order. For each line the product's stock is
/// decremented atomically and its current price captured; the
/// order is inserted with status `new` and `total_amount` set to the sum of
/// `price * quantity`. Nothing above this function recomputes the total.
///
/// # Errors
///
/// - `OrderError::EmptyOrder` if `lines` is empty
/// - `OrderError::ProductNotFound` if a product does not exist
/// - `OrderError::InsufficientStock` if a product has fewer units than requested
/// - `OrderError::UnknownStatus` if the `new` status row is missing
pub async fn create_order_with_items(
    conn: &mut PgConnection,
    user_id: UserId,
    address_id: AddressId,
    lines: &[OrderLine],
) -> Result<OrderId, OrderError> {
    if lines.is_empty() {
        return Err(OrderError::EmptyOrder);
    }

    let lines = merge_lines(lines);
    let mut priced = Vec::with_capacity(lines.len());
    for line in &lines {
        let price: Option<Decimal> = sqlx::query_scalar(
            r"
            UPDATE products
            SET stock = stock - $2, updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            RETURNING price
            ",
        )
        .bind(line.product_id)
        .bind(line.quantity)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(price) = price else {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                    .bind(line.product_id)
                    .fetch_one(&mut *conn)
                    .await?;
            return Err(if exists {
                OrderError::InsufficientStock(line.product_id)
            } else {
                OrderError::ProductNotFound(line.product_id)
            });
        };

        let price = Price::new(price).map_err(|e| {
            OrderError::DataCorruption(format!("product {}: {e}", line.product_id))
        })?;
        priced.push((*line, price));
    }

    let total: Price = priced
        .iter()
        .map(|(line, price)| price.line_total(line.quantity.unsigned_abs()))
        .sum();

    let order_id: Option<OrderId> = sqlx::query_scalar(
        r"
        INSERT INTO orders (user_id, address_id, status_id, total_amount)
        SELECT $1, $2, s.id, $3
        FROM order_statuses s
        WHERE s.code = $4
        RETURNING id
        ",
    )
    .bind(user_id)
    .bind(address_id)
    .bind(total.amount())
    .bind(INITIAL_STATUS)
    .fetch_optional(&mut *conn)
    .await?;
    let order_id = order_id.ok_or_else(|| OrderError::UnknownStatus(INITIAL_STATUS.to_owned()))?;

    for (line, price) in &priced {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity, price) VALUES ($1, $2, $3, $4)",
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(price.amount())
        .execute(&mut *conn)
        .await?;
    }

    Ok(order_id)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Pick the house identifier: `house` if non-blank, else `apartment`.
///
/// # Errors
///
/// Returns `OrderError::InvalidAddress` if both are blank.
pub fn resolve_house(address: &NewAddress) -> Result<&str, OrderError> {
    [address.house.as_deref(), address.apartment.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .ok_or(OrderError::InvalidAddress)
}

/// Merge lines for the same product and sort them by product id.
#[must_use]
pub fn merge_lines(lines: &[OrderLine]) -> Vec<OrderLine> {
    let mut merged: BTreeMap<ProductId, i32> = BTreeMap::new();
    for line in lines {
        let quantity = merged.entry(line.product_id).or_default();
        *quantity = quantity.saturating_add(line.quantity);
    }
    merged
        .into_iter()
        .map(|(product_id, quantity)| OrderLine {
            product_id,
            quantity,
        })
        .collect()
}

/// Normalize raw cart items into order lines.
///
/// `product_id` (or `productId`) and `quantity` may be JSON numbers or
/// numeric strings. A missing, non-numeric or non-positive quantity counts
/// as 1. Other fields (`price`, `name`) are ignored: prices come from the
/// catalog.
///
/// # Errors
///
/// Returns `OrderError::InvalidItem` if an item is not an object or its
/// product id is missing or not an integer.
pub fn normalize_items(items: &[Value]) -> Result<Vec<OrderLine>, OrderError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let invalid = |reason: &str| OrderError::InvalidItem {
                index,
                reason: reason.to_owned(),
            };

            let fields = item.as_object().ok_or_else(|| invalid("expected an object"))?;
            let raw_id = fields
                .get("product_id")
                .or_else(|| fields.get("productId"))
                .ok_or_else(|| invalid("missing product_id"))?;
            let product_id = coerce_integer(raw_id)
                .and_then(|id| i32::try_from(id).ok())
                .ok_or_else(|| invalid("product_id must be an integer"))?;

            let quantity = fields
                .get("quantity")
                .and_then(coerce_integer)
                .and_then(|q| i32::try_from(q).ok())
                .filter(|q| *q > 0)
                .unwrap_or(1);

            Ok(OrderLine {
                product_id: ProductId::new(product_id),
                quantity,
            })
        })
        .collect()
}

/// Read an integer from a JSON number or numeric string.
///
/// Floats are accepted only when they have no fractional part.
fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .and_then(float_to_i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .and_then(float_to_i64)
            })
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)] // range checked first
fn float_to_i64(f: f64) -> Option<i64> {
    (f >= i64::MIN as f64 && f <= i64::MAX as f64).then_some(f as i64)
}

/// Flatten an address into one display line.
///
/// Order: postal code, city, `street house`, `кв. <apartment>`, full name.
/// Blank parts are skipped and the rest joined with `", "`.
#[must_use]
pub fn format_address(
    postal_code: Option<&str>,
    city: Option<&str>,
    street: Option<&str>,
    house: Option<&str>,
    apartment: Option<&str>,
    full_name: Option<&str>,
) -> String {
    fn non_blank(s: Option<&str>) -> Option<&str> {
        s.map(str::trim).filter(|s| !s.is_empty())
    }

    let street_house = [non_blank(street), non_blank(house)]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    [
        non_blank(postal_code).map(str::to_owned),
        non_blank(city).map(str::to_owned),
        Some(street_house).filter(|s| !s.is_empty()),
        non_blank(apartment).map(|apt| format!("кв. {apt}")),
        non_blank(full_name).map(str::to_owned),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(", ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn address(house: Option<&str>, apartment: Option<&str>) -> NewAddress {
        NewAddress {
            house: house.map(str::to_owned),
            apartment: apartment.map(str::to_owned),
            ..NewAddress::default()
        }
    }

    #[test]
    fn test_resolve_house_prefers_house() {
        assert_eq!(resolve_house(&address(Some("12"), Some("4"))).unwrap(), "12");
    }

    #[test]
    fn test_resolve_house_falls_back_to_apartment() {
        assert_eq!(resolve_house(&address(Some("  "), Some("4"))).unwrap(), "4");
        assert_eq!(resolve_house(&address(None, Some(" 7 "))).unwrap(), "7");
    }

    #[test]
    fn test_resolve_house_rejects_blank_address() {
        assert!(matches!(
            resolve_house(&address(Some(""), Some("   "))),
            Err(OrderError::InvalidAddress)
        ));
        assert!(matches!(
            resolve_house(&address(None, None)),
            Err(OrderError::InvalidAddress)
        ));
    }

    #[test]
    fn test_normalize_items_coerces_types() {
        let lines = normalize_items(&[
            json!({"product_id": 1, "quantity": 2, "price": 100}),
            json!({"product_id": "2", "quantity": "3"}),
            json!({"productId": 3.0, "quantity": 1}),
        ])
        .unwrap();

        assert_eq!(
            lines,
            vec![
                OrderLine { product_id: ProductId::new(1), quantity: 2 },
                OrderLine { product_id: ProductId::new(2), quantity: 3 },
                OrderLine { product_id: ProductId::new(3), quantity: 1 },
            ]
        );
    }

    #[test]
    fn test_normalize_items_defaults_quantity_to_one() {
        let lines = normalize_items(&[
            json!({"product_id": 1}),
            json!({"product_id": 2, "quantity": "много"}),
            json!({"product_id": 3, "quantity": 0}),
            json!({"product_id": 4, "quantity": -5}),
            json!({"product_id": 5, "quantity": null}),
            json!({"product_id": 6, "quantity": 1.5}),
        ])
        .unwrap();

        assert!(lines.iter().all(|line| line.quantity == 1));
    }

    #[test]
    fn test_normalize_items_rejects_bad_product_id() {
        let err = normalize_items(&[json!({"product_id": 1}), json!({"product_id": "abc"})])
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidItem { index: 1, .. }));

        assert!(normalize_items(&[json!({"quantity": 2})]).is_err());
        assert!(normalize_items(&[json!(5)]).is_err());
        assert!(normalize_items(&[json!({"product_id": 9_999_999_999_i64})]).is_err());
    }

    #[test]
    fn test_merge_lines_sorts_and_combines() {
        let line = |id: i32, quantity: i32| OrderLine {
            product_id: ProductId::new(id),
            quantity,
        };
        assert_eq!(
            merge_lines(&[line(7, 1), line(2, 3), line(7, 2)]),
            vec![line(2, 3), line(7, 3)]
        );
        assert_eq!(merge_lines(&[line(5, 1), line(1, 1)]), merge_lines(&[line(1, 1), line(5, 1)]));
    }

    #[test]
    fn test_format_address_trims_parts() {
        let formatted = format_address(Some(" 420000 "), None, Some("ул. Баумана "), Some(" 5"), None, None);
        assert_eq!(formatted, "420000, ул. Баумана 5");
    }

    #[test]
    fn test_normalize_items_empty_is_ok() {
        // Emptiness is reported by create_order_with_items.
        assert!(normalize_items(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_format_address_full() {
        let formatted = format_address(
            Some("101000"),
            Some("Москва"),
            Some("ул. Тверская"),
            Some("7"),
            Some("15"),
            Some("Иван Петров"),
        );
        assert_eq!(
            formatted,
            "101000, Москва, ул. Тверская 7, кв. 15, Иван Петров"
        );
    }

    #[test]
    fn test_format_address_skips_blanks() {
        let formatted = format_address(None, Some("Казань"), Some(" "), Some("3"), Some(""), None);
        assert_eq!(formatted, "Казань, 3");
    }

    #[test]
    fn test_deleted_product_placeholder() {
        let item = OrderItem::try_from(OrderItemRow {
            id: OrderItemId::new(1),
            order_id: OrderId::new(1),
            product_id: None,
            quantity: 2,
            price: Decimal::from(150),
            product_name: None,
            product_photo: None,
        })
        .unwrap();

        assert_eq!(item.product_name, DELETED_PRODUCT_NAME);
        assert_eq!(item.photo.as_deref(), Some(DELETED_PRODUCT_PHOTO));
        assert_eq!(item.line_total.display(), "300.00");
    }
}
