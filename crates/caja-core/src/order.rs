//! # Order Aggregate
//!
//! The cashier's order: lines, discount and derived totals.
//!
//! ## Order Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Order Operations                                     │
//! │                                                                         │
//! │  Cashier Action          Operation                 Order Change         │
//! │  ──────────────          ─────────                 ────────────         │
//! │                                                                         │
//! │  Scan product ──────────► add_item() ────────────► push / merge line   │
//! │  Weigh product ─────────► add_weighed_item() ────► push line (tare)    │
//! │  Change quantity ───────► update_quantity() ─────► line.quantity = n   │
//! │  Change price tier ─────► update_item_price() ───► line.unit_price     │
//! │  Remove line ───────────► remove_item() ─────────► lines.remove(i)     │
//! │  Discount ──────────────► apply_discount() ──────► discount_total      │
//! │                                                                         │
//! │  subtotal() and total() are always recomputed from the lines.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - `total() == Σ line.total() - discount_total`, exact to the cent
//! - `0 <= discount_total <= subtotal()` after every operation
//! - Every line has `0 < quantity <= MAX_QUANTITY` and `unit_price >= 0`
//! - Line totals and the subtotal fit in `i64` cents, so they never wrap
//! - Lines can only change while the order is a draft
//! - A failed operation leaves the order untouched
//!
//! Operations never touch storage; saving is a separate step in caja-db.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::resolve_price;
use crate::quantity::Quantity;
use crate::tare::TareSelection;
use crate::types::{Client, OrderId, OrderStatus, PriceLevel, Product};
use crate::validation::validate_unit_price;
use crate::MAX_ORDER_LINES;

// =============================================================================
// Order Line
// =============================================================================

/// One product line of an order.
///
/// Product code, name and unit are snapshots taken when the line was added,
/// so the order reads the same even if the catalogue changes later.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLine {
    pub id: String,
    pub product_id: String,
    pub product_code: String,
    pub product_name: String,
    pub unit: String,
    pub quantity: Quantity,
    pub unit_price: Money,
    #[ts(type = "number")]
    pub price_level: PriceLevel,
    /// Unit price came from a manual override, not from the tier.
    pub custom_price: bool,
    /// Weighing that produced `quantity`, for weighed goods.
    pub tare: Option<TareSelection>,
}

impl OrderLine {
    fn from_product(
        product: &Product,
        quantity: Quantity,
        level: PriceLevel,
        unit_price: Money,
        custom_price: bool,
    ) -> Self {
        OrderLine {
            id: Uuid::new_v4().to_string(),
            product_id: product.id.clone(),
            product_code: product.code.clone(),
            product_name: product.name.clone(),
            unit: product.unit.clone(),
            quantity,
            unit_price,
            price_level: level,
            custom_price,
            tare: None,
        }
    }

    /// Line total: `quantity × unit_price`, rounded to the cent.
    #[inline]
    pub fn total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }

    fn checked_total(&self) -> Option<Money> {
        self.unit_price.checked_times(self.quantity)
    }
}

// =============================================================================
// Order
// =============================================================================

/// A cashier's in-progress or completed transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: OrderId,
    pub client_id: Option<String>,
    pub client_name: Option<String>,
    /// Lines in insertion (display) order.
    pub items: Vec<OrderLine>,
    pub discount_total: Money,
    /// Money collected so far. Credit portions are not collected money.
    pub amount_paid: Money,
    pub status: OrderStatus,
    pub is_credit: bool,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Default for Order {
    fn default() -> Self {
        Self::new()
    }
}

impl Order {
    /// Creates an empty draft with a temporary id.
    pub fn new() -> Self {
        let now = Utc::now();
        Order {
            id: OrderId::temporary(),
            client_id: None,
            client_name: None,
            items: Vec::new(),
            discount_total: Money::zero(),
            amount_paid: Money::zero(),
            status: OrderStatus::Draft,
            is_credit: false,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates an empty draft for a client.
    pub fn for_client(client: &Client) -> Self {
        let mut order = Order::new();
        order.client_id = Some(client.id.clone());
        order.client_name = Some(client.name.clone());
        order
    }

    // -------------------------------------------------------------------------
    // Derived totals
    // -------------------------------------------------------------------------

    /// Sum of line totals.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(OrderLine::total).sum()
    }

    /// `subtotal - discount_total`.
    pub fn total(&self) -> Money {
        self.subtotal() - self.discount_total
    }

    /// What is still owed: `total - amount_paid`, never negative.
    pub fn remaining_balance(&self) -> Money {
        self.total().saturating_sub_floor(self.amount_paid)
    }

    pub fn line(&self, line_id: &str) -> Option<&OrderLine> {
        self.items.iter().find(|l| l.id == line_id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total quantity per product across all lines, in first-seen order.
    ///
    /// The same product can appear on several lines (different tiers or
    /// separate weighings); stock is checked and decremented on the sum.
    pub fn quantities_by_product(&self) -> Vec<(String, Quantity)> {
        let mut totals: Vec<(String, Quantity)> = Vec::new();
        for line in &self.items {
            match totals.iter_mut().find(|(id, _)| *id == line.product_id) {
                Some((_, qty)) => *qty += line.quantity,
                None => totals.push((line.product_id.clone(), line.quantity)),
            }
        }
        totals
    }

    // -------------------------------------------------------------------------
    // Client
    // -------------------------------------------------------------------------

    /// Attaches a client to a draft.
    pub fn set_client(&mut self, client: &Client) -> CoreResult<()> {
        self.ensure_editable("change client")?;
        self.client_id = Some(client.id.clone());
        self.client_name = Some(client.name.clone());
        self.touch();
        Ok(())
    }

    /// Turns the draft back into a general (walk-in) sale.
    pub fn clear_client(&mut self) -> CoreResult<()> {
        self.ensure_editable("change client")?;
        self.client_id = None;
        self.client_name = None;
        self.touch();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Line operations
    // -------------------------------------------------------------------------

    /// Adds a product to the order.
    ///
    /// ## Merge Policy
    /// A line with the same product, the same price level and the same unit
    /// price absorbs the new quantity. Anything else (another tier, a
    /// different manual price) becomes a new line. Weighed lines are never
    /// merged.
    ///
    /// ## Returns
    /// The id of the line that now holds the quantity.
    pub fn add_item(
        &mut self,
        product: &Product,
        quantity: Quantity,
        level: PriceLevel,
        unit_price_override: Option<Money>,
    ) -> CoreResult<String> {
        self.ensure_editable("add items")?;
        ensure_valid_quantity(quantity)?;

        let unit_price = resolve_price(product, level, unit_price_override);
        validate_unit_price(unit_price)?;
        let custom_price = unit_price_override.is_some_and(|p| p.is_positive());

        let merge_into = self.items.iter().position(|l| {
            l.product_id == product.id
                && l.price_level == level
                && l.unit_price == unit_price
                && l.tare.is_none()
        });

        if let Some(index) = merge_into {
            let merged = self.items[index]
                .quantity
                .checked_add(quantity)
                .unwrap_or(Quantity::from_millis(i64::MAX));
            ensure_valid_quantity(merged)?;
            return self.edit_lines(quantity, |items| {
                items[index].quantity = merged;
                items[index].id.clone()
            });
        }

        self.ensure_room()?;
        let line = OrderLine::from_product(product, quantity, level, unit_price, custom_price);
        self.edit_lines(quantity, |items| {
            let id = line.id.clone();
            items.push(line);
            id
        })
    }

    /// Adds a weighed product; the net weight becomes the line quantity.
    pub fn add_weighed_item(
        &mut self,
        product: &Product,
        selection: TareSelection,
        level: PriceLevel,
        unit_price_override: Option<Money>,
    ) -> CoreResult<String> {
        self.ensure_editable("add items")?;
        ensure_valid_quantity(selection.net_weight)?;
        self.ensure_room()?;

        let unit_price = resolve_price(product, level, unit_price_override);
        validate_unit_price(unit_price)?;
        let custom_price = unit_price_override.is_some_and(|p| p.is_positive());

        let mut line = OrderLine::from_product(
            product,
            selection.net_weight,
            level,
            unit_price,
            custom_price,
        );
        let net_weight = selection.net_weight;
        line.tare = Some(selection);
        self.edit_lines(net_weight, |items| {
            let id = line.id.clone();
            items.push(line);
            id
        })
    }

    /// Removes a line.
    pub fn remove_item(&mut self, line_id: &str) -> CoreResult<()> {
        self.ensure_editable("remove items")?;
        let index = self.line_index(line_id)?;
        self.items.remove(index);
        self.clamp_discount();
        self.touch();
        Ok(())
    }

    /// Sets a line's quantity. Use [`Order::remove_item`] to delete a line.
    pub fn update_quantity(&mut self, line_id: &str, quantity: Quantity) -> CoreResult<()> {
        self.ensure_editable("change quantities")?;
        ensure_valid_quantity(quantity)?;
        let index = self.line_index(line_id)?;
        self.edit_lines(quantity, |items| items[index].quantity = quantity)
    }

    /// Re-prices a line from a tier or a manual price.
    pub fn update_item_price(
        &mut self,
        line_id: &str,
        product: &Product,
        level: PriceLevel,
        custom_price: Option<Money>,
    ) -> CoreResult<()> {
        self.ensure_editable("change prices")?;
        let index = self.line_index(line_id)?;
        if self.items[index].product_id != product.id {
            return Err(CoreError::ProductNotFound(
                self.items[index].product_id.clone(),
            ));
        }

        let unit_price = resolve_price(product, level, custom_price);
        validate_unit_price(unit_price)?;

        let quantity = self.items[index].quantity;
        self.edit_lines(quantity, |items| {
            let line = &mut items[index];
            line.unit_price = unit_price;
            line.price_level = level;
            line.custom_price = custom_price.is_some_and(|p| p.is_positive());
        })
    }

    /// Sets the order-level discount.
    pub fn apply_discount(&mut self, amount: Money) -> CoreResult<()> {
        self.ensure_editable("apply a discount")?;
        let subtotal = self.subtotal();
        if amount.is_negative() || amount > subtotal {
            return Err(CoreError::InvalidDiscount {
                discount: amount,
                subtotal,
            });
        }
        self.discount_total = amount;
        self.touch();
        Ok(())
    }

    /// Removes the order-level discount.
    pub fn clear_discount(&mut self) -> CoreResult<()> {
        self.ensure_editable("apply a discount")?;
        self.discount_total = Money::zero();
        self.touch();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Status
    // -------------------------------------------------------------------------

    /// Abandons a draft or an uncollected credit order.
    pub fn cancel(&mut self) -> CoreResult<()> {
        self.transition(OrderStatus::Cancelled, "cancel")
    }

    /// Moves to `next` if the transition table allows it.
    pub fn transition(&mut self, next: OrderStatus, operation: &str) -> CoreResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(self.status_error(operation));
        }
        self.status = next;
        self.touch();
        Ok(())
    }

    pub(crate) fn status_error(&self, operation: &str) -> CoreError {
        CoreError::InvalidOrderStatus {
            order_id: self.id.to_string(),
            current_status: self.status.to_string(),
            operation: operation.to_string(),
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn ensure_editable(&self, operation: &str) -> CoreResult<()> {
        if self.status != OrderStatus::Draft {
            return Err(self.status_error(operation));
        }
        Ok(())
    }

    fn ensure_room(&self) -> CoreResult<()> {
        if self.items.len() >= MAX_ORDER_LINES {
            return Err(CoreError::TooManyLines {
                max: MAX_ORDER_LINES,
            });
        }
        Ok(())
    }

    /// Applies `edit` to a copy of the lines and keeps it only if every
    /// line total and the subtotal still fit in cents. `quantity` is the
    /// one reported when they do not.
    fn edit_lines<R>(
        &mut self,
        quantity: Quantity,
        edit: impl FnOnce(&mut Vec<OrderLine>) -> R,
    ) -> CoreResult<R> {
        let mut items = self.items.clone();
        let result = edit(&mut items);

        let fits = items
            .iter()
            .try_fold(Money::zero(), |acc, line| acc.checked_add(line.checked_total()?))
            .is_some();
        if !fits {
            return Err(CoreError::InvalidQuantity { quantity });
        }

        self.items = items;
        self.clamp_discount();
        self.touch();
        Ok(result)
    }

    fn line_index(&self, line_id: &str) -> CoreResult<usize> {
        self.items
            .iter()
            .position(|l| l.id == line_id)
            .ok_or_else(|| CoreError::LineNotFound(line_id.to_string()))
    }

    /// Keeps `discount_total <= subtotal` after lines shrink.
    fn clamp_discount(&mut self) {
        let subtotal = self.subtotal();
        if self.discount_total > subtotal {
            self.discount_total = subtotal;
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn ensure_valid_quantity(quantity: Quantity) -> CoreResult<()> {
    if !quantity.is_valid_amount() {
        return Err(CoreError::InvalidQuantity { quantity });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
