//! # Domain Types
//!
//! Core domain types shared by the pricing, order and settlement modules.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Client      │   │  PaymentRecord  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  code (business)│   │  credit_limit   │   │  order_id (FK)  │       │
//! │  │  stock          │   │  balance        │   │  kind           │       │
//! │  │  prices[1..=5]  │   │  price level    │   │  amount         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   PriceLevel    │   │   OrderStatus   │   │  CashMovement   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  1 general      │   │  Draft          │   │  Sale           │       │
//! │  │  …              │   │  Pending        │   │  Installment    │       │
//! │  │  5 special      │   │  PartiallyPaid  │   └─────────────────┘       │
//! │  └─────────────────┘   │  Paid           │                              │
//! │                        │  Cancelled      │                              │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`Order`](crate::order::Order) aggregate lives in its own module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::quantity::Quantity;
use crate::{PRICE_LEVELS, TEMPORARY_ID_PREFIX};

// =============================================================================
// Price Level
// =============================================================================

/// One of the five price tiers a product exposes (1 general … 5 special).
///
/// Construct through [`PriceLevel::new`]; deserialization goes through the
/// same check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct PriceLevel(u8);

impl PriceLevel {
    /// The general (walk-in) tier.
    pub const GENERAL: PriceLevel = PriceLevel(1);

    /// Validates a price level.
    ///
    /// ## Example
    /// ```rust
    /// use caja_core::types::PriceLevel;
    ///
    /// assert_eq!(PriceLevel::new(3).unwrap().get(), 3);
    /// assert!(PriceLevel::new(0).is_err());
    /// assert!(PriceLevel::new(6).is_err());
    /// ```
    pub fn new(level: i64) -> CoreResult<Self> {
        if (1..=PRICE_LEVELS as i64).contains(&level) {
            Ok(PriceLevel(level as u8))
        } else {
            Err(CoreError::InvalidPriceLevel { level })
        }
    }

    #[inline]
    pub const fn get(&self) -> u8 {
        self.0
    }

    /// Zero-based index into `Product::prices`.
    #[inline]
    pub const fn index(&self) -> usize {
        (self.0 - 1) as usize
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        PriceLevel::GENERAL
    }
}

impl TryFrom<i64> for PriceLevel {
    type Error = CoreError;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        PriceLevel::new(level)
    }
}

impl From<PriceLevel> for u8 {
    fn from(level: PriceLevel) -> u8 {
        level.0
    }
}

impl fmt::Display for PriceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalogue entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business code printed on shelves and scanned at the counter.
    pub code: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Product line (category).
    pub line: Option<String>,

    /// Product subline (subcategory).
    pub subline: Option<String>,

    /// Sales unit ("pz", "kg", ...).
    pub unit: String,

    /// Current stock in thousandths of `unit`.
    pub stock: Quantity,

    /// Purchase cost.
    pub cost: Money,

    /// The five price tiers, `prices[0]` is price1.
    ///
    /// By convention price1 ≤ price2 ≤ … but this is not enforced.
    pub prices: [Money; 5],

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price for a tier.
    #[inline]
    pub fn price(&self, level: PriceLevel) -> Money {
        self.prices[level.index()]
    }

    /// Checks if the requested quantity is available.
    pub fn has_stock(&self, quantity: Quantity) -> bool {
        quantity <= self.stock
    }
}

// =============================================================================
// Client
// =============================================================================

/// A credit-bearing counterparty.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub name: String,

    /// Maximum outstanding balance before an override is needed.
    pub credit_limit: Money,

    /// Current outstanding credit (non-negative).
    pub balance: Money,

    /// Tier used when this client's items are added without an explicit one.
    #[ts(type = "number")]
    pub default_price_level: PriceLevel,

    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Credit still available before reaching the limit (may be negative
    /// after an authorised override).
    #[inline]
    pub fn available_credit(&self) -> Money {
        self.credit_limit - self.balance
    }
}

// =============================================================================
// Tare Option
// =============================================================================

/// A container type the weight screen offers (crate, sack, box).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TareOption {
    pub id: String,
    pub name: String,
    /// Weight of one empty container.
    pub weight: Quantity,
}

// =============================================================================
// Order Id
// =============================================================================

/// Order identifier.
///
/// Orders built on the terminal before their first save carry a temporary
/// id (`tmp-…`); the data store replaces it with a UUID on creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderId(String);

impl OrderId {
    /// A fresh temporary id for an unsaved order.
    pub fn temporary() -> Self {
        OrderId(format!("{}{}", TEMPORARY_ID_PREFIX, Uuid::new_v4()))
    }

    /// A fresh persisted id.
    pub fn generate() -> Self {
        OrderId(Uuid::new_v4().to_string())
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMPORARY_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderId {
    fn from(id: String) -> Self {
        OrderId(id)
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        OrderId(id.to_string())
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
///
/// ```text
///            ┌──────────► Paid ◄───────────────┐
///            │              ▲                  │
///  Draft ────┼──► Pending ──┼──► PartiallyPaid ┘
///            │      │
///            └──────┴──────► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Items are being added on the terminal.
    Draft,
    /// Settled on credit, nothing collected yet.
    Pending,
    /// Some money collected, balance remaining.
    PartiallyPaid,
    /// Fully collected.
    Paid,
    /// Abandoned.
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Draft,
        OrderStatus::Pending,
        OrderStatus::PartiallyPaid,
        OrderStatus::Paid,
        OrderStatus::Cancelled,
    ];

    /// Statuses an order may move to `next` from.
    pub fn predecessors(next: OrderStatus) -> impl Iterator<Item = OrderStatus> {
        Self::ALL
            .into_iter()
            .filter(move |from| from.can_transition_to(next))
    }

    /// Checks the transition table.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Draft, Pending)
                | (Draft, PartiallyPaid)
                | (Draft, Paid)
                | (Draft, Cancelled)
                | (Pending, PartiallyPaid)
                | (Pending, Paid)
                | (Pending, Cancelled)
                | (PartiallyPaid, PartiallyPaid)
                | (PartiallyPaid, Paid)
        )
    }

    /// Paid and cancelled orders never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Cancelled)
    }

    /// Credit orders with a balance still to collect.
    pub fn is_awaiting_collection(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::PartiallyPaid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Pending => "pending",
            OrderStatus::PartiallyPaid => "partially_paid",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Draft
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Kind
// =============================================================================

/// How a persisted payment record was tendered.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Cash,
    Card,
    Transfer,
    /// Amount charged to the client's account.
    Credit,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Cash => "cash",
            PaymentKind::Card => "card",
            PaymentKind::Transfer => "transfer",
            PaymentKind::Credit => "credit",
        }
    }
}

// =============================================================================
// Payment Record
// =============================================================================

/// A payment towards an order.
/// An order can have several for mixed payments and installments.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentRecord {
    pub id: String,
    pub order_id: String,
    pub kind: PaymentKind,
    pub amount: Money,
    /// For cash: amount the customer handed over.
    pub tendered: Option<Money>,
    /// For cash: change returned.
    pub change: Option<Money>,
    /// External reference (card voucher, transfer folio).
    pub reference: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Cash Movement
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CashMovementKind {
    /// Cash taken for a sale.
    Sale,
    /// Cash taken for an installment (abono).
    Installment,
}

/// A cash-register movement, emitted for cash tenders only.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashMovement {
    pub id: String,
    pub order_id: Option<String>,
    pub kind: CashMovementKind,
    pub amount: Money,
    pub description: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_level_bounds() {
        for level in 1..=5 {
            assert!(PriceLevel::new(level).is_ok());
        }
        assert!(matches!(
            PriceLevel::new(0),
            Err(CoreError::InvalidPriceLevel { level: 0 })
        ));
        assert!(PriceLevel::new(6).is_err());
        assert!(PriceLevel::new(-1).is_err());
    }

    #[test]
    fn test_price_level_deserialize_checks_range() {
        let ok: PriceLevel = serde_json::from_str("2").unwrap();
        assert_eq!(ok.get(), 2);
        assert!(serde_json::from_str::<PriceLevel>("9").is_err());
    }

    #[test]
    fn test_order_id_temporary_marker() {
        let tmp = OrderId::temporary();
        assert!(tmp.is_temporary());
        assert!(tmp.as_str().starts_with("tmp-"));

        let persisted = OrderId::generate();
        assert!(!persisted.is_temporary());
    }

    #[test]
    fn test_status_transitions() {
        use OrderStatus::*;
        assert!(Draft.can_transition_to(Paid));
        assert!(Draft.can_transition_to(Pending));
        assert!(Pending.can_transition_to(PartiallyPaid));
        assert!(PartiallyPaid.can_transition_to(Paid));
        assert!(Pending.can_transition_to(Cancelled));

        assert!(!Paid.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Draft));
        assert!(!PartiallyPaid.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Draft));

        assert!(Paid.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!Pending.is_terminal());

        let into_cancelled: Vec<_> = OrderStatus::predecessors(Cancelled).collect();
        assert_eq!(into_cancelled, vec![Draft, Pending]);
        assert_eq!(OrderStatus::predecessors(Draft).count(), 0);
    }

    #[test]
    fn test_status_default() {
        assert_eq!(OrderStatus::default(), OrderStatus::Draft);
    }
}
