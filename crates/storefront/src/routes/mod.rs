//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health, /health/ready          - Probes
//!
//! # Auth (rate limited per client IP)
//! POST /api/auth/register              - Create a client account
//! POST /api/auth/login                 - Exchange credentials for a token
//!
//! # Users
//! GET  /api/users/me                   - Own profile
//! PUT  /api/users/me                   - Update profile or password
//! GET  /api/users                      - All users (admin)
//! PUT  /api/users/{id}/role            - Assign role (admin)
//! DELETE /api/users/{id}               - Delete user (admin)
//!
//! # Catalog (writes need staff)
//! /api/products[/{id}], /api/categories[/{id}], /api/manufacturers[/{id}]
//!
//! # Orders and payments
//! POST /api/orders                     - Checkout
//! GET  /api/orders?userId=&orderId=    - History or one order
//! PUT  /api/orders/{id}/status         - Change status (staff)
//! POST /api/payments                   - Record payment (staff)
//! GET  /api/payments/{orderId}         - Payment of an order
//!
//! # Cart (session cookie)
//! GET /api/cart, POST /api/cart/items, PUT|DELETE /api/cart/items/{productId}, DELETE /api/cart
//!
//! # Admin
//! GET  /api/audit, /api/audit/stats    - Audit trail
//! /api/backup/*                        - Backups, see [`backup`]
//! ```

pub mod audit;
pub mod auth;
pub mod backup;
pub mod cart;
pub mod categories;
pub mod health;
pub mod manufacturers;
pub mod orders;
pub mod payments;
pub mod products;
pub mod users;

use axum::Router;

use crate::middleware::create_session_layer;
use crate::state::AppState;

/// Create all routes for the storefront.
///
/// Only the cart routes carry the session layer, so API calls without a
/// cart never create a session row.
pub fn routes(state: &AppState) -> Router<AppState> {
    let session_layer = create_session_layer(state.pool(), state.config());

    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(users::router())
        .merge(products::router())
        .merge(categories::router())
        .merge(manufacturers::router())
        .merge(orders::router())
        .merge(payments::router())
        .merge(audit::router())
        .merge(backup::router())
        .merge(cart::router().layer(session_layer))
}
