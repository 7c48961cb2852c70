//! Payment repository. One payment row per order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use vitrina_core::{OrderId, PaymentId, PaymentMethod, PaymentStatus, Price};

use super::RepositoryError;
use crate::models::Payment;

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: PaymentId,
    order_id: OrderId,
    method: PaymentMethod,
    status: PaymentStatus,
    amount: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = RepositoryError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let amount = Price::new(row.amount).map_err(|e| {
            RepositoryError::DataCorruption(format!("payment {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            method: row.method,
            status: row.status,
            amount,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for order payments.
pub struct PaymentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create or replace the payment of an order.
    ///
    /// The amount is taken from the order's stored total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn upsert(
        &self,
        order_id: OrderId,
        method: PaymentMethod,
        status: PaymentStatus,
    ) -> Result<Payment, RepositoryError> {
        sqlx::query_as::<_, PaymentRow>(
            r"
            INSERT INTO payments (order_id, method, status, amount)
            SELECT o.id, $2, $3, o.total_amount FROM orders o WHERE o.id = $1
            ON CONFLICT (order_id) DO UPDATE
            SET method = EXCLUDED.method,
                status = EXCLUDED.status,
                updated_at = NOW()
            RETURNING id, order_id, method, status, amount, created_at, updated_at
            ",
        )
        .bind(order_id)
        .bind(method)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
        .and_then(Payment::try_from)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Payment>, RepositoryError> {
        sqlx::query_as::<_, PaymentRow>(
            r"
            SELECT id, order_id, method, status, amount, created_at, updated_at
            FROM payments
            WHERE order_id = $1
            ",
        )
        .bind(order_id)
        .fetch_optional(self.pool)
        .await?
        .map(Payment::try_from)
        .transpose()
    }
}
