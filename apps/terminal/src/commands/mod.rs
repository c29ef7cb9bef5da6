//! # Commands Module
//!
//! Every operation the cashier terminal exposes.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs         ◄─── You are here (exports, shared lookups)
//! ├── order.rs       ◄─── Draft editing: add/remove items, prices, discount
//! ├── settlement.rs  ◄─── settle, installments, payment history
//! ├── credit.rs      ◄─── Credit limit checks
//! └── catalog.rs     ◄─── Products, clients, tare options, stock receipts
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  $ caja add-item <order> AZUC-01 --quantity 2.5                         │
//! │         │                                                               │
//! │         ▼  (clap → dispatch in lib.rs)                                  │
//! │  commands::order::add_item(                                             │
//! │      db: &DbState,          ◄── Injected                                │
//! │      notifier: &Notifier,   ◄── Injected                                │
//! │      order_id, request,     ◄── From the command line                   │
//! │  ) -> Result<OrderResponse, ApiError>                                   │
//! │         │                                                               │
//! │         │  1. load order / product / client through DataAccess          │
//! │         │  2. mutate with caja-core (unchanged on error)                │
//! │         │  3. persist, then publish ChangeEvent                         │
//! │         ▼                                                               │
//! │  stdout: OrderResponse as JSON                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod credit;
pub mod order;
pub mod settlement;

use caja_core::{Client, Order};

use crate::error::ApiError;
use crate::state::DbState;

/// Loads the client attached to `order`, if any.
pub(crate) async fn order_client(db: &DbState, order: &Order) -> Result<Option<Client>, ApiError> {
    match &order.client_id {
        Some(id) => Ok(Some(db.inner().get_client(id).await?)),
        None => Ok(None),
    }
}
