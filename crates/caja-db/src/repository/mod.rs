//! # Repository Module
//!
//! Database repository implementations for Caja POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  Terminal command                                                      │
//! │       │                                                                 │
//! │       │  data.get_product(id)      (DataAccess trait)                   │
//! │       ▼                                                                 │
//! │  Database                                                              │
//! │  ├── products()     get_by_id, get_by_code, update_stock               │
//! │  ├── clients()      get_by_id, list_active, set_balance                │
//! │  ├── tares()        list, get_by_id                                    │
//! │  ├── orders()       create, save, get_by_id, list_open, update_status  │
//! │  ├── payments()     insert, list_for_order                             │
//! │  ├── cash_movements() insert, list_for_order                           │
//! │  └── settlements()  commit (one transaction)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes that take part in a settlement are free functions over
//! `&mut SqliteConnection`, so they run the same on a pooled connection or
//! inside the settlement transaction.

pub mod cash;
pub mod client;
pub mod order;
pub mod payment;
pub mod product;
pub mod settlement;
pub mod tare;
