//! # Tare Calculator
//!
//! Converts a scale reading into billable net weight.
//!
//! ## User Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Weigh bulk product                                                     │
//! │                                                                         │
//! │  Scale: 50 kg gross   Container: "Reja" 2.5 kg   Boxes: 3              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  compute_net() ── 50 - 2.5 × 3 = 42.5 kg                               │
//! │       │                                                                 │
//! │       ├── net <= 0?        → NonPositiveNetWeight                       │
//! │       ├── net > stock?     → InsufficientStock                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Order line: 42.5 kg @ price level                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stock check here is advisory. Stock is only decremented when the
//! order is settled, and settlement checks again.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::quantity::{Quantity, MAX_QUANTITY};
use crate::types::{Product, TareOption};

/// A completed weighing, kept on the order line as a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TareSelection {
    /// Container chosen on the weight screen, if any.
    pub tare_option_id: Option<String>,
    pub tare_name: Option<String>,
    pub tare_weight_per_unit: Quantity,
    pub box_count: u32,
    pub gross_weight: Quantity,
    pub net_weight: Quantity,
}

impl TareSelection {
    /// Total container weight subtracted from the gross reading.
    pub fn tare_total(&self) -> Quantity {
        self.tare_weight_per_unit.times_count(self.box_count)
    }
}

/// Computes the net weight: `gross - tare × boxes`.
///
/// ## Example
/// ```rust
/// use caja_core::quantity::Quantity;
/// use caja_core::tare::compute_net;
///
/// let net = compute_net(
///     Quantity::from_millis(2_500),
///     3,
///     Quantity::from_units(50),
/// ).unwrap();
/// assert_eq!(net, Quantity::from_millis(42_500));
/// ```
pub fn compute_net(
    tare_weight: Quantity,
    box_count: u32,
    gross_weight: Quantity,
) -> CoreResult<Quantity> {
    if gross_weight > MAX_QUANTITY {
        return Err(CoreError::InvalidQuantity {
            quantity: gross_weight,
        });
    }
    let tare = tare_weight
        .checked_times_count(box_count)
        .ok_or(CoreError::InvalidQuantity {
            quantity: tare_weight,
        })?;
    let net = gross_weight.checked_sub(tare).unwrap_or(Quantity::zero());

    if !net.is_positive() {
        return Err(CoreError::NonPositiveNetWeight {
            gross: gross_weight,
            tare,
        });
    }

    Ok(net)
}

/// Rejects a quantity the product cannot cover.
pub fn check_stock(product: &Product, requested: Quantity) -> CoreResult<()> {
    if !product.has_stock(requested) {
        return Err(CoreError::InsufficientStock {
            code: product.code.clone(),
            available: product.stock,
            requested,
        });
    }

    Ok(())
}

/// Runs a full weighing for `product`: net weight plus advisory stock check.
///
/// `tare` is `None` when the goods are weighed without a container.
pub fn weigh(
    product: &Product,
    tare: Option<&TareOption>,
    box_count: u32,
    gross_weight: Quantity,
) -> CoreResult<TareSelection> {
    let tare_weight = tare.map(|t| t.weight).unwrap_or_default();
    let net_weight = compute_net(tare_weight, box_count, gross_weight)?;
    check_stock(product, net_weight)?;

    Ok(TareSelection {
        tare_option_id: tare.map(|t| t.id.clone()),
        tare_name: tare.map(|t| t.name.clone()),
        tare_weight_per_unit: tare_weight,
        box_count,
        gross_weight,
        net_weight,
    })
}
