//! Server-side cart kept in the visitor's session.
//!
//! The cart is created on the first add and disappears with the session:
//! after the configured inactivity timeout or an explicit clear.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use vitrina_core::{Price, ProductId};

use crate::models::Product;

/// Session key holding the cart.
pub const CART_KEY: &str = "cart";

/// Upper bound for a single line.
pub const MAX_LINE_QUANTITY: u32 = 999;

/// One cart line as stored in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Product IDs and quantities, in the order they were first added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// Add `quantity` of a product, merging with an existing line.
    pub fn add(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => {
                line.quantity = line.quantity.saturating_add(quantity).min(MAX_LINE_QUANTITY);
            }
            None => self.lines.push(CartLine {
                product_id,
                quantity: quantity.min(MAX_LINE_QUANTITY),
            }),
        }
    }

    /// Set the quantity of a line. Zero removes it. Returns whether the
    /// product was in the cart.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(product_id);
        }
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => {
                line.quantity = quantity.min(MAX_LINE_QUANTITY);
                true
            }
            None => false,
        }
    }

    /// Remove a line. Returns whether it existed.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != before
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.lines.iter().map(|l| l.product_id).collect()
    }

    /// Load the cart from the session. A missing or unreadable value is an
    /// empty cart.
    pub async fn load(session: &Session) -> Self {
        match session.get::<Self>(CART_KEY).await {
            Ok(cart) => cart.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read cart from session");
                Self::default()
            }
        }
    }

    /// Store the cart in the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn save(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.insert(CART_KEY, self).await
    }

    /// Drop the cart together with its session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store rejects the delete.
    pub async fn clear(session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.flush().await
    }
}

/// A cart line joined with current product data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub product_id: ProductId,
    pub name: String,
    pub photo: Option<String>,
    pub price: Price,
    pub quantity: u32,
    pub line_total: Price,
    /// Current stock covers the requested quantity.
    pub in_stock: bool,
}

/// The cart as returned by the API.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: Price,
    pub item_count: u32,
}

impl CartView {
    /// Join cart lines with products. Lines whose product no longer exists
    /// are left out.
    #[must_use]
    pub fn build(cart: &Cart, products: &[Product]) -> Self {
        let items: Vec<CartItemView> = cart
            .lines
            .iter()
            .filter_map(|line| {
                let product = products.iter().find(|p| p.id == line.product_id)?;
                Some(CartItemView {
                    product_id: product.id,
                    name: product.name.clone(),
                    photo: product.photo.clone(),
                    price: product.price,
                    quantity: line.quantity,
                    line_total: product.price.line_total(line.quantity),
                    in_stock: i64::from(product.stock) >= i64::from(line.quantity),
                })
            })
            .collect();

        Self {
            total: items.iter().map(|i| i.line_total).sum(),
            item_count: items.iter().map(|i| i.quantity).sum(),
            items,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;

    fn product(id: i32, price: i64, stock: i32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Товар {id}"),
            description: None,
            price: Price::new(Decimal::new(price, 0)).unwrap(),
            stock,
            photo: None,
            category_id: None,
            category_name: None,
            manufacturer_id: None,
            manufacturer_name: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_merges_quantities() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(1), 2);
        cart.add(ProductId::new(2), 1);
        cart.add(ProductId::new(1), 3);

        assert_eq!(
            cart.lines,
            vec![
                CartLine { product_id: ProductId::new(1), quantity: 5 },
                CartLine { product_id: ProductId::new(2), quantity: 1 },
            ]
        );
    }

    #[test]
    fn test_add_zero_is_ignored() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(1), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_quantity_is_capped() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(1), MAX_LINE_QUANTITY);
        cart.add(ProductId::new(1), 5);
        assert_eq!(cart.lines[0].quantity, MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(1), 2);

        assert!(cart.set_quantity(ProductId::new(1), 0));
        assert!(cart.is_empty());
        assert!(!cart.set_quantity(ProductId::new(9), 4));
    }

    #[test]
    fn test_remove_reports_presence() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(1), 1);
        assert!(cart.remove(ProductId::new(1)));
        assert!(!cart.remove(ProductId::new(1)));
    }

    #[test]
    fn test_view_skips_deleted_products_and_sums() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(1), 2);
        cart.add(ProductId::new(2), 1);
        cart.add(ProductId::new(3), 1);

        let view = CartView::build(&cart, &[product(1, 100, 5), product(2, 150, 0)]);

        assert_eq!(view.items.len(), 2);
        assert_eq!(view.total.amount(), Decimal::new(350, 0));
        assert_eq!(view.item_count, 3);
        assert!(view.items[0].in_stock);
        assert!(!view.items[1].in_stock);
    }
}
