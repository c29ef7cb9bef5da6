//! # Payment Repository
//!
//! Payment records: one per tendered portion of a settlement, plus one per
//! installment. Credit portions are recorded with kind `credit` so an
//! order's payment history always adds up to its total.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use caja_core::{Money, PaymentKind, PaymentRecord};

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: String,
    order_id: String,
    kind: PaymentKind,
    amount_cents: i64,
    tendered_cents: Option<i64>,
    change_cents: Option<i64>,
    reference: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<PaymentRow> for PaymentRecord {
    fn from(row: PaymentRow) -> Self {
        PaymentRecord {
            id: row.id,
            order_id: row.order_id,
            kind: row.kind,
            amount: Money::from_cents(row.amount_cents),
            tendered: row.tendered_cents.map(Money::from_cents),
            change: row.change_cents.map(Money::from_cents),
            reference: row.reference,
            created_at: row.created_at,
        }
    }
}

/// Repository for payment records.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Records a single payment outside a settlement.
    pub async fn insert(&self, payment: &PaymentRecord) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_payment(&mut conn, payment).await
    }

    /// Gets all payments for an order, oldest first.
    pub async fn list_for_order(&self, order_id: &str) -> DbResult<Vec<PaymentRecord>> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, order_id, kind, amount_cents, tendered_cents, change_cents,
                   reference, created_at
            FROM payments
            WHERE order_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PaymentRecord::from).collect())
    }

    /// Money actually collected for an order (credit portions excluded).
    pub async fn total_collected(&self, order_id: &str) -> DbResult<Money> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(amount_cents) FROM payments WHERE order_id = ?1 AND kind != 'credit'",
        )
        .bind(order_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_cents(total.unwrap_or(0)))
    }
}

pub(crate) async fn insert_payment(
    conn: &mut SqliteConnection,
    payment: &PaymentRecord,
) -> DbResult<()> {
    debug!(
        order_id = %payment.order_id,
        kind = payment.kind.as_str(),
        amount = %payment.amount,
        "Recording payment"
    );

    sqlx::query(
        r#"
        INSERT INTO payments (
            id, order_id, kind,
            amount_cents, tendered_cents, change_cents,
            reference, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.order_id)
    .bind(payment.kind)
    .bind(payment.amount.cents())
    .bind(payment.tendered.map(|m| m.cents()))
    .bind(payment.change.map(|m| m.cents()))
    .bind(&payment.reference)
    .bind(payment.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
