//! # Cash Movement Repository
//!
//! The cash register ledger. Only cash tenders write here: sales paid in
//! cash (or the cash portion of a mixed payment) and cash installments.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use caja_core::{CashMovement, CashMovementKind, Money};

#[derive(Debug, FromRow)]
struct CashMovementRow {
    id: String,
    order_id: Option<String>,
    kind: CashMovementKind,
    amount_cents: i64,
    description: String,
    created_at: DateTime<Utc>,
}

impl From<CashMovementRow> for CashMovement {
    fn from(row: CashMovementRow) -> Self {
        CashMovement {
            id: row.id,
            order_id: row.order_id,
            kind: row.kind,
            amount: Money::from_cents(row.amount_cents),
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CashMovementRepository {
    pool: SqlitePool,
}

impl CashMovementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CashMovementRepository { pool }
    }

    pub async fn insert(&self, movement: &CashMovement) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_cash_movement(&mut conn, movement).await
    }

    /// Movements recorded for one order.
    pub async fn list_for_order(&self, order_id: &str) -> DbResult<Vec<CashMovement>> {
        let rows = sqlx::query_as::<_, CashMovementRow>(
            r#"
            SELECT id, order_id, kind, amount_cents, description, created_at
            FROM cash_movements
            WHERE order_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CashMovement::from).collect())
    }
}

pub(crate) async fn insert_cash_movement(
    conn: &mut SqliteConnection,
    movement: &CashMovement,
) -> DbResult<()> {
    debug!(amount = %movement.amount, description = %movement.description, "Recording cash movement");

    sqlx::query(
        r#"
        INSERT INTO cash_movements (id, order_id, kind, amount_cents, description, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.order_id)
    .bind(movement.kind)
    .bind(movement.amount.cents())
    .bind(&movement.description)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
