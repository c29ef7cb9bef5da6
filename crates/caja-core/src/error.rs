//! # Error Types
//!
//! Domain-specific error types for caja-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  caja-core errors (this file)                                          │
//! │  ├── CoreError        - Pricing, tare, order and settlement rules      │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  caja-db errors (separate crate)                                       │
//! │  └── DbError          - Data access failures                           │
//! │                                                                         │
//! │  Terminal errors (in app)                                              │
//! │  └── ApiError         - What the operator sees (serialized)            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → Operator               │
//! │                          DbError   ↗                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant is raised before anything is mutated, so an operation that
//! fails leaves its order exactly as it was.

use thiserror::Error;

use crate::money::Money;
use crate::quantity::Quantity;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Price level outside 1..=5.
    #[error("Invalid price level {level}: must be between 1 and 5")]
    InvalidPriceLevel { level: i64 },

    /// Tare weight consumed the whole gross weight.
    ///
    /// ## User Workflow
    /// ```text
    /// Gross 5 kg, tare 2.5 kg × 2 boxes
    ///      │
    ///      ▼
    /// Net = 5 - 5 = 0  → NonPositiveNetWeight, no line is created
    /// ```
    #[error("Net weight must be positive: gross {gross}, tare {tare}")]
    NonPositiveNetWeight { gross: Quantity, tare: Quantity },

    /// Requested quantity exceeds the product's stock.
    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: Quantity,
        requested: Quantity,
    },

    /// No line with this id in the order.
    #[error("Order line not found: {0}")]
    LineNotFound(String),

    /// Quantity must be strictly positive.
    #[error("Invalid quantity {quantity}: must be greater than zero")]
    InvalidQuantity { quantity: Quantity },

    /// Discount negative or larger than the subtotal.
    #[error("Invalid discount {discount}: must be between $0.00 and the subtotal {subtotal}")]
    InvalidDiscount { discount: Money, subtotal: Money },

    /// Mixed payment portions do not add up to the order total.
    #[error("Payment breakdown {received} does not match order total {expected}")]
    PaymentMismatch { expected: Money, received: Money },

    /// Credit requested on an order without a client.
    #[error("Credit payment requires a client")]
    NoClientForCredit,

    /// Credit exposure above the client's limit without an override.
    ///
    /// This is a soft failure: retry the settlement with an administrative
    /// override.
    #[error(
        "Credit limit exceeded for {client}: balance {balance} + {requested} > limit {limit}"
    )]
    CreditLimitExceeded {
        client: String,
        limit: Money,
        balance: Money,
        requested: Money,
    },

    /// Cash handed over does not cover the amount due.
    #[error("Insufficient cash: due {due}, received {received}")]
    InsufficientCash { due: Money, received: Money },

    /// Payment amount is invalid.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// Installments accept cash, card or transfer only.
    #[error("Installments cannot be paid with {method}")]
    UnsupportedInstallmentMethod { method: String },

    /// Order is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Editing lines of a paid or pending order
    /// - Settling an order twice
    /// - Taking an installment on a draft order
    #[error("Order {order_id} is {current_status}, cannot {operation}")]
    InvalidOrderStatus {
        order_id: String,
        current_status: String,
        operation: String,
    },

    /// Settlement of an order with no lines.
    #[error("Order {0} has no items")]
    EmptyOrder(String),

    /// Order has reached the maximum number of lines.
    #[error("Order cannot have more than {max} lines")]
    TooManyLines { max: usize },

    /// Product referenced by a line was not supplied.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            code: "NUEZ-01".to_string(),
            available: Quantity::from_units(40),
            requested: Quantity::from_millis(42_500),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for NUEZ-01: available 40, requested 42.5"
        );

        let err = CoreError::PaymentMismatch {
            expected: Money::from_cents(15000),
            received: Money::from_cents(14000),
        };
        assert_eq!(
            err.to_string(),
            "Payment breakdown $140.00 does not match order total $150.00"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
