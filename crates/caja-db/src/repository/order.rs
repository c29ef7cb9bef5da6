//! # Order Repository
//!
//! Persistence for orders and their lines.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CREATE DRAFT                                                       │
//! │     └── create() → tmp-… id replaced with a UUID                       │
//! │                                                                         │
//! │  2. EDIT (terminal commands)                                           │
//! │     └── core mutation → save() → header + lines rewritten              │
//! │                                                                         │
//! │  3. SETTLE                                                             │
//! │     └── SettlementRepository::commit() → status, amount_paid           │
//! │                                                                         │
//! │  4. (OPTIONAL) CANCEL                                                  │
//! │     └── update_status(Cancelled)                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only drafts can be saved. Every status write is guarded by the status
//! the caller last saw.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use caja_core::{
    Money, Order, OrderId, OrderLine, OrderStatus, PriceLevel, Quantity, SettlementPlan,
    TareSelection,
};

const ORDER_COLUMNS: &str = "id, client_id, client_name, status, discount_cents, \
     amount_paid_cents, is_credit, notes, created_at, updated_at";

const LINE_COLUMNS: &str = "id, product_id, product_code, product_name, unit, \
     quantity_millis, unit_price_cents, price_level, custom_price, tare_json";

#[derive(Debug, FromRow)]
struct OrderRow {
    id: String,
    client_id: Option<String>,
    client_name: Option<String>,
    status: OrderStatus,
    discount_cents: i64,
    amount_paid_cents: i64,
    is_credit: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderLine>) -> Order {
        Order {
            id: OrderId::from(self.id),
            client_id: self.client_id,
            client_name: self.client_name,
            items,
            discount_total: Money::from_cents(self.discount_cents),
            amount_paid: Money::from_cents(self.amount_paid_cents),
            status: self.status,
            is_credit: self.is_credit,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct OrderLineRow {
    id: String,
    product_id: String,
    product_code: String,
    product_name: String,
    unit: String,
    quantity_millis: i64,
    unit_price_cents: i64,
    price_level: i64,
    custom_price: bool,
    tare_json: Option<String>,
}

impl TryFrom<OrderLineRow> for OrderLine {
    type Error = DbError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        let price_level =
            PriceLevel::new(row.price_level).map_err(|e| DbError::corrupt("OrderLine", &row.id, e))?;
        let tare = row
            .tare_json
            .as_deref()
            .map(serde_json::from_str::<TareSelection>)
            .transpose()
            .map_err(|e| DbError::corrupt("OrderLine", &row.id, e))?;

        Ok(OrderLine {
            id: row.id,
            product_id: row.product_id,
            product_code: row.product_code,
            product_name: row.product_name,
            unit: row.unit,
            quantity: Quantity::from_millis(row.quantity_millis),
            unit_price: Money::from_cents(row.unit_price_cents),
            price_level,
            custom_price: row.custom_price,
            tare,
        })
    }
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Persists a new draft.
    ///
    /// A temporary id (`tmp-…`) is replaced with a fresh UUID; the returned
    /// order carries the persisted id.
    pub async fn create(&self, order: &Order) -> DbResult<Order> {
        let mut order = order.clone();
        if order.id.is_temporary() {
            order.id = OrderId::generate();
        }

        debug!(id = %order.id, lines = order.items.len(), "Creating order");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, client_id, client_name, status,
                subtotal_cents, discount_cents, total_cents, amount_paid_cents,
                is_credit, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(order.id.as_str())
        .bind(&order.client_id)
        .bind(&order.client_name)
        .bind(order.status)
        .bind(order.subtotal().cents())
        .bind(order.discount_total.cents())
        .bind(order.total().cents())
        .bind(order.amount_paid.cents())
        .bind(order.is_credit)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        insert_lines(&mut tx, order.id.as_str(), &order.items).await?;

        tx.commit().await?;
        Ok(order)
    }

    /// Saves a draft's client, discount, notes and lines.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no such order
    /// * `Err(DbError::Conflict)` - the stored order is no longer a draft
    pub async fn save(&self, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, lines = order.items.len(), "Saving order");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                client_id = ?2,
                client_name = ?3,
                subtotal_cents = ?4,
                discount_cents = ?5,
                total_cents = ?6,
                notes = ?7,
                updated_at = ?8
            WHERE id = ?1 AND status = 'draft'
            "#,
        )
        .bind(order.id.as_str())
        .bind(&order.client_id)
        .bind(&order.client_name)
        .bind(order.subtotal().cents())
        .bind(order.discount_total.cents())
        .bind(order.total().cents())
        .bind(&order.notes)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let err = match fetch_status(&mut tx, order.id.as_str()).await? {
                Some(status) => DbError::conflict(
                    "Order",
                    order.id.as_str(),
                    format!("only drafts can be edited, order is {}", status),
                ),
                None => DbError::not_found("Order", order.id.as_str()),
            };
            return Err(err);
        }

        sqlx::query("DELETE FROM order_lines WHERE order_id = ?1")
            .bind(order.id.as_str())
            .execute(&mut *tx)
            .await?;
        insert_lines(&mut tx, order.id.as_str(), &order.items).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Gets an order with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLUMNS);
        let Some(row) = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let items = self.get_lines(id).await?;
        Ok(Some(row.into_order(items)))
    }

    /// Lists drafts and credit orders awaiting collection, oldest first.
    ///
    /// These are the cashier's open tabs.
    pub async fn list_open(&self) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders \
             WHERE status IN ('draft', 'pending', 'partially_paid') \
             ORDER BY created_at",
            ORDER_COLUMNS
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.get_lines(&row.id).await?;
            orders.push(row.into_order(items));
        }

        debug!(count = orders.len(), "Listed open orders");
        Ok(orders)
    }

    /// Changes an order's status, enforcing the transition table.
    pub async fn update_status(&self, id: &str, status: OrderStatus) -> DbResult<()> {
        let from: Vec<String> = OrderStatus::predecessors(status)
            .map(|s| format!("'{}'", s.as_str()))
            .collect();

        debug!(id = %id, to = %status, "Updating order status");

        let mut conn = self.pool.acquire().await?;
        let updated = if from.is_empty() {
            0
        } else {
            let sql = format!(
                "UPDATE orders SET status = ?2, updated_at = ?3 \
                 WHERE id = ?1 AND status IN ({})",
                from.join(", ")
            );
            sqlx::query(&sql)
                .bind(id)
                .bind(status)
                .bind(Utc::now())
                .execute(&mut *conn)
                .await?
                .rows_affected()
        };

        if updated == 0 {
            return Err(match fetch_status(&mut conn, id).await? {
                Some(current) => DbError::conflict(
                    "Order",
                    id,
                    format!("cannot change status from {} to {}", current, status),
                ),
                None => DbError::not_found("Order", id),
            });
        }

        Ok(())
    }

    async fn get_lines(&self, order_id: &str) -> DbResult<Vec<OrderLine>> {
        let sql = format!(
            "SELECT {} FROM order_lines WHERE order_id = ?1 ORDER BY position",
            LINE_COLUMNS
        );
        let rows = sqlx::query_as::<_, OrderLineRow>(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(OrderLine::try_from).collect()
    }
}

async fn fetch_status(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<OrderStatus>> {
    let status = sqlx::query_scalar::<_, OrderStatus>("SELECT status FROM orders WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(status)
}

async fn insert_lines(
    conn: &mut SqliteConnection,
    order_id: &str,
    lines: &[OrderLine],
) -> DbResult<()> {
    for (position, line) in lines.iter().enumerate() {
        let tare_json = line
            .tare
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DbError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO order_lines (
                id, order_id, position, product_id,
                product_code, product_name, unit,
                quantity_millis, unit_price_cents, price_level, custom_price,
                tare_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&line.id)
        .bind(order_id)
        .bind(position as i64)
        .bind(&line.product_id)
        .bind(&line.product_code)
        .bind(&line.product_name)
        .bind(&line.unit)
        .bind(line.quantity.millis())
        .bind(line.unit_price.cents())
        .bind(i64::from(line.price_level.get()))
        .bind(line.custom_price)
        .bind(tare_json)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Writes the plan's order header inside a settlement transaction.
///
/// Guarded by everything the plan was validated against: status, amount
/// already collected, total and client. For a draft the stored lines must
/// also still add up, per product, to the plan's stock decrements. Two
/// terminals cannot both settle the same order state, and a plan built
/// before another terminal edited the draft is rejected.
pub(crate) async fn apply_settlement(
    conn: &mut SqliteConnection,
    plan: &SettlementPlan,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE orders SET
            status = ?2,
            amount_paid_cents = ?3,
            is_credit = ?4,
            updated_at = ?5
        WHERE id = ?1
          AND status = ?6
          AND amount_paid_cents = ?7
          AND total_cents = ?8
          AND client_id IS ?9
        "#,
    )
    .bind(&plan.order_id)
    .bind(plan.new_status)
    .bind(plan.amount_paid.cents())
    .bind(plan.is_credit)
    .bind(plan.settled_at)
    .bind(plan.expected_status)
    .bind(plan.previous_amount_paid.cents())
    .bind(plan.order_total.cents())
    .bind(&plan.client_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(match fetch_status(conn, &plan.order_id).await? {
            Some(status) if status != plan.expected_status => DbError::conflict(
                "Order",
                &plan.order_id,
                format!("expected status {}, found {}", plan.expected_status, status),
            ),
            Some(_) => DbError::conflict(
                "Order",
                &plan.order_id,
                "order changed since the payment was validated",
            ),
            None => DbError::not_found("Order", &plan.order_id),
        });
    }

    if plan.expected_status == OrderStatus::Draft {
        ensure_lines_match(conn, plan).await?;
    }

    Ok(())
}

/// Compares the stored per-product quantities with the plan's decrements.
async fn ensure_lines_match(conn: &mut SqliteConnection, plan: &SettlementPlan) -> DbResult<()> {
    let mut stored: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT product_id, SUM(quantity_millis)
        FROM order_lines
        WHERE order_id = ?1
        GROUP BY product_id
        "#,
    )
    .bind(&plan.order_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut planned: Vec<(String, i64)> = plan
        .stock_decrements
        .iter()
        .map(|d| (d.product_id.clone(), d.quantity.millis()))
        .collect();

    stored.sort();
    planned.sort();

    if stored != planned {
        return Err(DbError::conflict(
            "Order",
            &plan.order_id,
            "lines changed since the payment was validated",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::test_support::sample_product;
    use caja_core::tare::weigh;

    #[tokio::test]
    async fn test_create_assigns_persisted_id() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let draft = Order::new();
        assert!(draft.id.is_temporary());

        let created = db.orders().create(&draft).await.unwrap();
        assert!(!created.id.is_temporary());

        let stored = db.orders().get_by_id(created.id.as_str()).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Draft);
        assert!(stored.items.is_empty());
    }

    #[tokio::test]
    async fn test_save_round_trips_lines_and_discount() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let beans = sample_product("FRIJOL-01", 100);
        let walnut = sample_product("NUEZ-01", 100);
        db.products().insert(&beans).await.unwrap();
        db.products().insert(&walnut).await.unwrap();

        let mut order = db.orders().create(&Order::new()).await.unwrap();
        order
            .add_item(&beans, Quantity::from_units(2), PriceLevel::GENERAL, None)
            .unwrap();
        let selection = weigh(&walnut, None, 0, Quantity::from_millis(1_250)).unwrap();
        order
            .add_weighed_item(&walnut, selection, PriceLevel::new(3).unwrap(), None)
            .unwrap();
        order.apply_discount(Money::from_cents(500)).unwrap();
        db.orders().save(&order).await.unwrap();

        let stored = db.orders().get_by_id(order.id.as_str()).await.unwrap().unwrap();
        assert_eq!(stored.items.len(), 2);
        assert_eq!(stored.items[0].product_code, "FRIJOL-01");
        assert_eq!(
            stored.items[1].tare.as_ref().map(|t| t.net_weight),
            Some(Quantity::from_millis(1_250))
        );
        assert_eq!(stored.total(), order.total());

        // lines removed in memory are removed in storage
        let first = order.items[0].id.clone();
        order.remove_item(&first).unwrap();
        db.orders().save(&order).await.unwrap();
        let stored = db.orders().get_by_id(order.id.as_str()).await.unwrap().unwrap();
        assert_eq!(stored.items.len(), 1);
    }

    #[tokio::test]
    async fn test_status_transitions_are_enforced() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = db.orders().create(&Order::new()).await.unwrap();
        let id = order.id.as_str();

        db.orders().update_status(id, OrderStatus::Cancelled).await.unwrap();
        let err = db.orders().update_status(id, OrderStatus::Paid).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        // cancelled orders cannot be edited either
        let err = db.orders().save(&order).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        let err = db
            .orders()
            .update_status("missing", OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_open_excludes_closed_orders() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let open = db.orders().create(&Order::new()).await.unwrap();
        let cancelled = db.orders().create(&Order::new()).await.unwrap();
        db.orders()
            .update_status(cancelled.id.as_str(), OrderStatus::Cancelled)
            .await
            .unwrap();

        let ids: Vec<OrderId> = db
            .orders()
            .list_open()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec![open.id]);
    }
}
