//! # DataAccess
//!
//! The persistence seam the terminal programs against. Command functions
//! hold an `Arc<dyn DataAccess>` and never see sqlx.
//!
//! ```text
//! ┌───────────────────┐        ┌─────────────────────┐
//! │ terminal commands │───────►│  dyn DataAccess     │
//! └───────────────────┘        └──────────┬──────────┘
//!                                         │ impl
//!                              ┌──────────▼──────────┐
//!                              │  Database (SQLite)  │
//!                              │  repositories       │
//!                              └─────────────────────┘
//! ```
//!
//! Single-entity getters return `DbError::NotFound` instead of `Option`:
//! every caller treats a missing row as a failure of the command.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use caja_core::{
    CashMovement, Client, Money, Order, OrderStatus, PaymentRecord, Product, Quantity,
    SettlementPlan, TareOption,
};

#[async_trait]
pub trait DataAccess: Send + Sync {
    // -------------------------------------------------------------------------
    // Catalogue
    // -------------------------------------------------------------------------

    async fn get_product(&self, id: &str) -> DbResult<Product>;

    async fn find_product_by_code(&self, code: &str) -> DbResult<Product>;

    async fn list_products(&self) -> DbResult<Vec<Product>>;

    /// Adds `delta` to on-hand stock. Fails without writing when the result
    /// would go negative.
    async fn update_product_stock(&self, id: &str, delta: Quantity) -> DbResult<Product>;

    // -------------------------------------------------------------------------
    // Clients
    // -------------------------------------------------------------------------

    async fn get_client(&self, id: &str) -> DbResult<Client>;

    async fn list_clients(&self) -> DbResult<Vec<Client>>;

    async fn update_client_balance(&self, id: &str, new_balance: Money) -> DbResult<()>;

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// Persists a new order and returns it carrying its permanent id.
    async fn create_order(&self, order: &Order) -> DbResult<Order>;

    /// Overwrites a draft's lines, discount and client.
    async fn save_order(&self, order: &Order) -> DbResult<()>;

    async fn update_order_status(&self, id: &str, status: OrderStatus) -> DbResult<()>;

    async fn get_order(&self, id: &str) -> DbResult<Order>;

    async fn list_open_orders(&self) -> DbResult<Vec<Order>>;

    // -------------------------------------------------------------------------
    // Payments and cash
    // -------------------------------------------------------------------------

    async fn record_payment(&self, payment: &PaymentRecord) -> DbResult<()>;

    async fn list_payments(&self, order_id: &str) -> DbResult<Vec<PaymentRecord>>;

    async fn record_cash_movement(&self, movement: &CashMovement) -> DbResult<()>;

    // -------------------------------------------------------------------------
    // Tare options
    // -------------------------------------------------------------------------

    async fn list_tare_options(&self) -> DbResult<Vec<TareOption>>;

    async fn get_tare_option(&self, id: &str) -> DbResult<TareOption>;

    // -------------------------------------------------------------------------
    // Settlement
    // -------------------------------------------------------------------------

    /// Applies every staged write of `plan` in one transaction, or none.
    async fn commit_settlement(&self, plan: &SettlementPlan) -> DbResult<()>;
}

#[async_trait]
impl DataAccess for Database {
    async fn get_product(&self, id: &str) -> DbResult<Product> {
        self.products()
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    async fn find_product_by_code(&self, code: &str) -> DbResult<Product> {
        self.products()
            .get_by_code(code)
            .await?
            .ok_or_else(|| DbError::not_found("Product", code))
    }

    async fn list_products(&self) -> DbResult<Vec<Product>> {
        self.products().list_active().await
    }

    async fn update_product_stock(&self, id: &str, delta: Quantity) -> DbResult<Product> {
        debug!(product_id = %id, delta = %delta, "Adjusting stock");
        self.products().update_stock(id, delta).await
    }

    async fn get_client(&self, id: &str) -> DbResult<Client> {
        self.clients()
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Client", id))
    }

    async fn list_clients(&self) -> DbResult<Vec<Client>> {
        self.clients().list_active().await
    }

    async fn update_client_balance(&self, id: &str, new_balance: Money) -> DbResult<()> {
        self.clients().set_balance(id, new_balance).await
    }

    async fn create_order(&self, order: &Order) -> DbResult<Order> {
        self.orders().create(order).await
    }

    async fn save_order(&self, order: &Order) -> DbResult<()> {
        self.orders().save(order).await
    }

    async fn update_order_status(&self, id: &str, status: OrderStatus) -> DbResult<()> {
        self.orders().update_status(id, status).await
    }

    async fn get_order(&self, id: &str) -> DbResult<Order> {
        self.orders()
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))
    }

    async fn list_open_orders(&self) -> DbResult<Vec<Order>> {
        self.orders().list_open().await
    }

    async fn record_payment(&self, payment: &PaymentRecord) -> DbResult<()> {
        self.payments().insert(payment).await
    }

    async fn list_payments(&self, order_id: &str) -> DbResult<Vec<PaymentRecord>> {
        self.payments().list_for_order(order_id).await
    }

    async fn record_cash_movement(&self, movement: &CashMovement) -> DbResult<()> {
        self.cash_movements().insert(movement).await
    }

    async fn list_tare_options(&self) -> DbResult<Vec<TareOption>> {
        self.tares().list().await
    }

    async fn get_tare_option(&self, id: &str) -> DbResult<TareOption> {
        self.tares()
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("TareOption", id))
    }

    async fn commit_settlement(&self, plan: &SettlementPlan) -> DbResult<()> {
        self.settlements().commit(plan).await
    }
}
