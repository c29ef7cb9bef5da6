//! # Settlement Engine
//!
//! Validates a payment against an order and stages every write the payment
//! causes in a [`SettlementPlan`].
//!
//! ## Settlement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Settlement Flow                                 │
//! │                                                                         │
//! │  settle(order, client, products, method, override)                      │
//! │       │                                                                 │
//! │       ├── order not draft / empty?          → error                     │
//! │       ├── Σ qty per product > stock?        → InsufficientStock         │
//! │       │                                                                 │
//! │       ├── Cash { received }   received >= total      → Paid             │
//! │       ├── Card / Transfer     full total             → Paid             │
//! │       ├── Credit              credit guard           → Pending          │
//! │       └── Mixed(breakdown)    Σ == total, guard      → Paid             │
//! │                                                        Pending          │
//! │                                                        PartiallyPaid    │
//! │       ▼                                                                 │
//! │  SettlementPlan                                                         │
//! │  ├── order status / amount_paid / is_credit                             │
//! │  ├── payment records                                                    │
//! │  ├── stock decrements                                                   │
//! │  ├── client balance delta                                               │
//! │  └── cash movement                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DataAccess::commit_settlement(plan)   one transaction, all-or-nothing  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Installments (abonos) against credit orders go through
//! [`settle_installment`] and produce the same kind of plan, without stock
//! movements.
//!
//! Nothing here touches storage. A plan that is never committed has no
//! effect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::credit::{authorize_credit, CreditOverride};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::order::Order;
use crate::quantity::Quantity;
use crate::tare::check_stock;
use crate::types::{
    CashMovement, CashMovementKind, Client, OrderStatus, PaymentKind, PaymentRecord, Product,
};
use crate::validation::{validate_non_negative, validate_reference};

// =============================================================================
// Payment Method
// =============================================================================

/// Split of a mixed payment across methods. Every portion is >= 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentBreakdown {
    #[serde(default)]
    pub cash: Money,
    #[serde(default)]
    pub card: Money,
    #[serde(default)]
    pub transfer: Money,
    #[serde(default)]
    pub credit: Money,
    /// Voucher of the card portion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_reference: Option<String>,
    /// Folio of the transfer portion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_reference: Option<String>,
}

impl PaymentBreakdown {
    /// Sum of all portions.
    pub fn total(&self) -> Money {
        self.cash + self.card + self.transfer + self.credit
    }

    /// Portions that are collected money (everything except credit).
    pub fn collected(&self) -> Money {
        self.cash + self.card + self.transfer
    }

    fn validate(&self) -> CoreResult<()> {
        validate_non_negative("cash", self.cash)?;
        validate_non_negative("card", self.card)?;
        validate_non_negative("transfer", self.transfer)?;
        validate_non_negative("credit", self.credit)?;
        validate_reference(self.card_reference.as_deref())?;
        validate_reference(self.transfer_reference.as_deref())?;
        Ok(())
    }
}

/// How the customer pays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash handed over; change is returned.
    Cash { received: Money },
    Card { reference: Option<String> },
    Transfer { reference: Option<String> },
    /// Charged in full to the client's account.
    Credit,
    Mixed(PaymentBreakdown),
}

impl PaymentMethod {
    pub fn name(&self) -> &'static str {
        match self {
            PaymentMethod::Cash { .. } => "cash",
            PaymentMethod::Card { .. } => "card",
            PaymentMethod::Transfer { .. } => "transfer",
            PaymentMethod::Credit => "credit",
            PaymentMethod::Mixed(_) => "mixed",
        }
    }
}

// =============================================================================
// Settlement Plan
// =============================================================================

/// A stock decrement for one product, summed over all of its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockDecrement {
    pub product_id: String,
    pub product_code: String,
    pub quantity: Quantity,
}

/// A relative change to a client's outstanding balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BalanceChange {
    pub client_id: String,
    pub delta: Money,
}

/// Every write a settlement causes, staged for one atomic commit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettlementPlan {
    pub order_id: String,
    /// Status the order must still have when the plan is committed.
    pub expected_status: OrderStatus,
    pub new_status: OrderStatus,
    /// Money collected before this settlement; guards concurrent installments.
    pub previous_amount_paid: Money,
    /// Cumulative money collected after this settlement.
    pub amount_paid: Money,
    pub is_credit: bool,
    /// Order total the payment was validated against.
    pub order_total: Money,
    /// Client the order had when the plan was built.
    pub client_id: Option<String>,
    pub payments: Vec<PaymentRecord>,
    /// Empty for installments.
    pub stock_decrements: Vec<StockDecrement>,
    pub balance_change: Option<BalanceChange>,
    pub cash_movement: Option<CashMovement>,
    pub remaining_balance: Money,
    pub change: Money,
    /// Administrator who approved exceeding the credit limit, if one did.
    pub authorized_by: Option<String>,
    #[ts(as = "String")]
    pub settled_at: DateTime<Utc>,
}

impl SettlementPlan {
    /// Mirrors a committed plan onto the in-memory order.
    pub fn apply_to(&self, order: &mut Order) {
        order.status = self.new_status;
        order.amount_paid = self.amount_paid;
        order.is_credit = self.is_credit;
        order.updated_at = self.settled_at;
    }
}

/// Accumulates the staged writes while a settlement is being validated.
struct PlanBuilder<'a> {
    order: &'a Order,
    now: DateTime<Utc>,
    payments: Vec<PaymentRecord>,
    cash_movement: Option<CashMovement>,
}

impl<'a> PlanBuilder<'a> {
    fn new(order: &'a Order) -> Self {
        PlanBuilder {
            order,
            now: Utc::now(),
            payments: Vec::new(),
            cash_movement: None,
        }
    }

    fn payment(&mut self, kind: PaymentKind, amount: Money, reference: Option<&String>) {
        if amount.is_zero() {
            return;
        }
        self.payments.push(PaymentRecord {
            id: Uuid::new_v4().to_string(),
            order_id: self.order.id.to_string(),
            kind,
            amount,
            tendered: None,
            change: None,
            reference: reference.cloned(),
            created_at: self.now,
        });
    }

    fn cash(&mut self, amount: Money, tendered: Money, kind: CashMovementKind) {
        if amount.is_zero() {
            return;
        }
        self.payments.push(PaymentRecord {
            id: Uuid::new_v4().to_string(),
            order_id: self.order.id.to_string(),
            kind: PaymentKind::Cash,
            amount,
            tendered: Some(tendered),
            change: Some(tendered - amount),
            reference: None,
            created_at: self.now,
        });

        let description = match kind {
            CashMovementKind::Sale => format!("Sale {}", self.order.id),
            CashMovementKind::Installment => format!("Installment {}", self.order.id),
        };
        self.cash_movement = Some(CashMovement {
            id: Uuid::new_v4().to_string(),
            order_id: Some(self.order.id.to_string()),
            kind,
            amount,
            description,
            created_at: self.now,
        });
    }
}

// =============================================================================
// Settle
// =============================================================================

/// Settles a draft order.
///
/// ## Arguments
/// * `client` - the order's client; ignored unless its id matches
///   `order.client_id`
/// * `products` - current catalogue rows for every product on the order
/// * `credit_override` - administrator approval for exceeding the limit
///
/// ## Example
/// ```rust,ignore
/// let plan = settle(&order, None, &products, &PaymentMethod::Cash {
///     received: Money::from_cents(20000),
/// }, None)?;
/// assert_eq!(plan.change.cents(), 5000);
/// db.commit_settlement(&plan).await?;
/// ```
pub fn settle(
    order: &Order,
    client: Option<&Client>,
    products: &[Product],
    method: &PaymentMethod,
    credit_override: Option<&CreditOverride>,
) -> CoreResult<SettlementPlan> {
    if order.status != OrderStatus::Draft || order.id.is_temporary() {
        return Err(order.status_error("settle"));
    }
    if order.is_empty() {
        return Err(CoreError::EmptyOrder(order.id.to_string()));
    }

    let client = client.filter(|c| order.client_id.as_deref() == Some(c.id.as_str()));
    let stock_decrements = stock_decrements(order, products)?;
    let total = order.total();
    let mut plan = PlanBuilder::new(order);
    let mut change = Money::zero();

    // (status, amount collected, credit charged)
    let (new_status, collected, credit) = match method {
        PaymentMethod::Cash { received } => {
            if *received < total {
                return Err(CoreError::InsufficientCash {
                    due: total,
                    received: *received,
                });
            }
            change = *received - total;
            plan.cash(total, *received, CashMovementKind::Sale);
            (OrderStatus::Paid, total, Money::zero())
        }
        PaymentMethod::Card { reference } => {
            validate_reference(reference.as_deref())?;
            plan.payment(PaymentKind::Card, total, reference.as_ref());
            (OrderStatus::Paid, total, Money::zero())
        }
        PaymentMethod::Transfer { reference } => {
            validate_reference(reference.as_deref())?;
            plan.payment(PaymentKind::Transfer, total, reference.as_ref());
            (OrderStatus::Paid, total, Money::zero())
        }
        PaymentMethod::Credit => {
            authorize_credit(client, total, credit_override)?;
            plan.payment(PaymentKind::Credit, total, None);
            (OrderStatus::Pending, Money::zero(), total)
        }
        PaymentMethod::Mixed(breakdown) => {
            breakdown.validate()?;
            if !breakdown.total().reconciles_with(total) {
                return Err(CoreError::PaymentMismatch {
                    expected: total,
                    received: breakdown.total(),
                });
            }
            if breakdown.credit.is_positive() {
                authorize_credit(client, breakdown.credit, credit_override)?;
            }

            plan.cash(breakdown.cash, breakdown.cash, CashMovementKind::Sale);
            plan.payment(PaymentKind::Card, breakdown.card, breakdown.card_reference.as_ref());
            plan.payment(
                PaymentKind::Transfer,
                breakdown.transfer,
                breakdown.transfer_reference.as_ref(),
            );
            plan.payment(PaymentKind::Credit, breakdown.credit, None);

            let status = if breakdown.credit.is_zero() {
                OrderStatus::Paid
            } else if breakdown.collected().is_zero() {
                OrderStatus::Pending
            } else {
                OrderStatus::PartiallyPaid
            };
            (status, breakdown.collected(), breakdown.credit)
        }
    };

    let balance_change = match client {
        Some(c) if credit.is_positive() => Some(BalanceChange {
            client_id: c.id.clone(),
            delta: credit,
        }),
        _ => None,
    };

    Ok(SettlementPlan {
        order_id: order.id.to_string(),
        expected_status: order.status,
        new_status,
        previous_amount_paid: order.amount_paid,
        amount_paid: collected,
        is_credit: credit.is_positive(),
        order_total: total,
        client_id: order.client_id.clone(),
        payments: plan.payments,
        stock_decrements,
        balance_change,
        cash_movement: plan.cash_movement,
        remaining_balance: total.saturating_sub_floor(collected),
        change,
        authorized_by: credit_override
            .filter(|_| credit.is_positive())
            .map(|o| o.authorized_by().to_string()),
        settled_at: plan.now,
    })
}

/// Authoritative stock check, summed per product across lines.
fn stock_decrements(order: &Order, products: &[Product]) -> CoreResult<Vec<StockDecrement>> {
    order
        .quantities_by_product()
        .into_iter()
        .map(|(product_id, quantity)| {
            let product = products
                .iter()
                .find(|p| p.id == product_id)
                .ok_or_else(|| CoreError::ProductNotFound(product_id.clone()))?;
            check_stock(product, quantity)?;
            Ok(StockDecrement {
                product_id,
                product_code: product.code.clone(),
                quantity,
            })
        })
        .collect()
}

// =============================================================================
// Installments
// =============================================================================

/// Takes an installment (abono) against a pending or partially paid order.
///
/// ## Rules
/// - Tender is cash, card or transfer
/// - `0 < amount <= remaining balance`
/// - The order is paid once the remaining balance is within one cent
/// - The client's balance drops by `amount`, never below zero
pub fn settle_installment(
    order: &Order,
    client: Option<&Client>,
    amount: Money,
    tender: &PaymentMethod,
) -> CoreResult<SettlementPlan> {
    if !order.status.is_awaiting_collection() {
        return Err(order.status_error("take an installment"));
    }

    if !amount.is_positive() {
        return Err(CoreError::InvalidPaymentAmount {
            reason: "installment must be greater than zero".to_string(),
        });
    }
    let remaining = order.remaining_balance();
    if amount > remaining {
        return Err(CoreError::InvalidPaymentAmount {
            reason: format!("{} exceeds remaining balance {}", amount, remaining),
        });
    }

    let mut plan = PlanBuilder::new(order);
    let mut change = Money::zero();
    match tender {
        PaymentMethod::Cash { received } => {
            if *received < amount {
                return Err(CoreError::InsufficientCash {
                    due: amount,
                    received: *received,
                });
            }
            change = *received - amount;
            plan.cash(amount, *received, CashMovementKind::Installment);
        }
        PaymentMethod::Card { reference } => {
            validate_reference(reference.as_deref())?;
            plan.payment(PaymentKind::Card, amount, reference.as_ref());
        }
        PaymentMethod::Transfer { reference } => {
            validate_reference(reference.as_deref())?;
            plan.payment(PaymentKind::Transfer, amount, reference.as_ref());
        }
        PaymentMethod::Credit | PaymentMethod::Mixed(_) => {
            return Err(CoreError::UnsupportedInstallmentMethod {
                method: tender.name().to_string(),
            });
        }
    }

    let remaining = remaining - amount;
    let new_status = if remaining.is_settled_balance() {
        OrderStatus::Paid
    } else {
        OrderStatus::PartiallyPaid
    };

    let balance_change = client
        .filter(|c| order.is_credit && order.client_id.as_deref() == Some(c.id.as_str()))
        .map(|c| BalanceChange {
            client_id: c.id.clone(),
            delta: -amount.min(c.balance.max(Money::zero())),
        })
        .filter(|change| !change.delta.is_zero());

    Ok(SettlementPlan {
        order_id: order.id.to_string(),
        expected_status: order.status,
        new_status,
        previous_amount_paid: order.amount_paid,
        amount_paid: order.amount_paid + amount,
        is_credit: order.is_credit,
        order_total: order.total(),
        client_id: order.client_id.clone(),
        payments: plan.payments,
        stock_decrements: Vec::new(),
        balance_change,
        cash_movement: plan.cash_movement,
        remaining_balance: remaining,
        change,
        authorized_by: None,
        settled_at: plan.now,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
