//! # caja-core: Pure Business Logic for Caja POS
//!
//! This crate holds the order, pricing and settlement rules of the cashier
//! screen as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caja POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Cashier Terminal (apps/terminal)                │   │
//! │  │   add-item, add-weighed, apply-discount, settle, check-credit   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ caja-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ │   │
//! │  │   │ pricing │ │  tare   │ │  order  │ │ credit  │ │settlement│ │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └──────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    caja-db (Database Layer)                     │   │
//! │  │        DataAccess trait, SQLite repositories, migrations        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer cents
//! - [`quantity`] - Fractional quantities and weights in thousandths
//! - [`types`] - Domain types (Product, Client, Order, Payment, ...)
//! - [`pricing`] - Price tier resolution
//! - [`tare`] - Gross to net weight conversion
//! - [`order`] - Order aggregate mutations
//! - [`credit`] - Credit limit guard
//! - [`settlement`] - Payment validation and settlement planning
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use caja_core::money::Money;
//! use caja_core::quantity::Quantity;
//!
//! let unit_price = Money::from_cents(6500); // $65.00
//! let line_total = unit_price.times(Quantity::from_units(2));
//! assert_eq!(line_total.cents(), 13000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod credit;
pub mod error;
pub mod money;
pub mod order;
pub mod pricing;
pub mod quantity;
pub mod settlement;
pub mod tare;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use credit::{check_credit, CreditDecision, CreditOverride};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, MONEY_TOLERANCE};
pub use order::{Order, OrderLine};
pub use pricing::resolve_price;
pub use quantity::{Quantity, MAX_QUANTITY};
pub use settlement::{
    settle, settle_installment, PaymentBreakdown, PaymentMethod, SettlementPlan,
};
pub use tare::{compute_net, TareSelection};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Number of price tiers every product exposes (price1 … price5).
pub const PRICE_LEVELS: u8 = 5;

/// Maximum lines allowed in a single order.
pub const MAX_ORDER_LINES: usize = 200;

/// Prefix marking an order id that has not been persisted yet.
pub const TEMPORARY_ID_PREFIX: &str = "tmp-";
