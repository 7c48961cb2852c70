//! Payment domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use vitrina_core::{OrderId, PaymentId, PaymentMethod, PaymentStatus, Price};

/// The payment attached to an order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub amount: Price,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
