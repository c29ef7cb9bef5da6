//! # API Error Type
//!
//! Unified error type for terminal commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Caja POS                               │
//! │                                                                         │
//! │  $ caja settle <order> credit                                           │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Data access error? ─── DbError::QueryFailed("...") ──┐         │  │
//! │  │         │                                             │         │  │
//! │  │         ▼                                             ▼         │  │
//! │  │  Business rule? ─── CoreError::CreditLimitExceeded ── ApiError ─►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  stderr: {"code":"CREDIT_LIMIT_EXCEEDED","message":"Credit limit ..."} │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failure leaves the order as it was: draft edits are saved only
//! after the core accepted them, and settlements commit all-or-nothing.

use serde::Serialize;
use thiserror::Error;

use caja_core::{CoreError, ValidationError};
use caja_db::DbError;

/// Error returned from terminal commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for NUEZ-01: available 40, requested 42.5"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("[{code:?}] {message}")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for command responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Any persistence failure
    DataAccessFailure,

    InvalidPriceLevel,
    NonPositiveNetWeight,
    InsufficientStock,
    LineNotFound,
    InvalidQuantity,
    InvalidDiscount,
    PaymentMismatch,
    NoClientForCredit,

    /// Soft failure: retry with an administrative override
    CreditLimitExceeded,

    InsufficientCash,
    InvalidPaymentAmount,
    UnsupportedInstallmentMethod,
    InvalidOrderStatus,
    EmptyOrder,
    TooManyLines,

    /// Override password did not verify
    AuthorizationDenied,

    /// No administrative password is configured on this terminal
    AuthorizationUnavailable,

    /// Internal error
    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            // Lost a stock race to another terminal at commit time
            DbError::InsufficientStock {
                product_id,
                requested,
            } => ApiError::new(
                ErrorCode::InsufficientStock,
                format!(
                    "Insufficient stock for {}: {} requested",
                    product_id, requested
                ),
            ),
            // Another terminal charged the same client first
            DbError::CreditLimitExceeded {
                client_id,
                requested,
            } => ApiError::new(
                ErrorCode::CreditLimitExceeded,
                format!(
                    "Credit limit exceeded for client {}: {} no longer fits",
                    client_id, requested
                ),
            ),
            DbError::Conflict { entity, id, reason } => ApiError::new(
                ErrorCode::DataAccessFailure,
                format!("{} {} changed: {}", entity, id, reason),
            ),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::DataAccessFailure,
                format!("{} '{}' already exists", field, value),
            ),
            other => {
                // Log the actual error but return a generic message
                tracing::error!(error = %other, "Data access failed");
                ApiError::new(ErrorCode::DataAccessFailure, "Data access failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::InvalidPriceLevel { .. } => ErrorCode::InvalidPriceLevel,
            CoreError::NonPositiveNetWeight { .. } => ErrorCode::NonPositiveNetWeight,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::LineNotFound(_) => ErrorCode::LineNotFound,
            CoreError::InvalidQuantity { .. } => ErrorCode::InvalidQuantity,
            CoreError::InvalidDiscount { .. } => ErrorCode::InvalidDiscount,
            CoreError::PaymentMismatch { .. } => ErrorCode::PaymentMismatch,
            CoreError::NoClientForCredit => ErrorCode::NoClientForCredit,
            CoreError::CreditLimitExceeded { .. } => ErrorCode::CreditLimitExceeded,
            CoreError::InsufficientCash { .. } => ErrorCode::InsufficientCash,
            CoreError::InvalidPaymentAmount { .. } => ErrorCode::InvalidPaymentAmount,
            CoreError::UnsupportedInstallmentMethod { .. } => {
                ErrorCode::UnsupportedInstallmentMethod
            }
            CoreError::InvalidOrderStatus { .. } => ErrorCode::InvalidOrderStatus,
            CoreError::EmptyOrder(_) => ErrorCode::EmptyOrder,
            CoreError::TooManyLines { .. } => ErrorCode::TooManyLines,
            CoreError::ProductNotFound(_) => ErrorCode::NotFound,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caja_core::Money;

    #[test]
    fn test_codes_serialize_screaming_snake() {
        let err = ApiError::from(CoreError::CreditLimitExceeded {
            client: "Abarrotes Lupita".to_string(),
            limit: Money::from_cents(500_000),
            balance: Money::from_cents(480_000),
            requested: Money::from_cents(30_000),
        });

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "CREDIT_LIMIT_EXCEEDED");
        assert!(json["message"].as_str().unwrap().contains("Abarrotes Lupita"));
    }

    #[test]
    fn test_db_failures_hide_details() {
        let err = ApiError::from(DbError::QueryFailed("near \"SELEC\": syntax error".into()));
        assert_eq!(err.code, ErrorCode::DataAccessFailure);
        assert_eq!(err.message, "Data access failed");

        let err = ApiError::from(DbError::not_found("Order", "abc"));
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Order not found: abc");
    }

    #[test]
    fn test_commit_races_keep_their_codes() {
        let err = ApiError::from(DbError::InsufficientStock {
            product_id: "p1".to_string(),
            requested: "2".to_string(),
        });
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let err = ApiError::from(DbError::CreditLimitExceeded {
            client_id: "c1".to_string(),
            requested: "$80.00".to_string(),
        });
        assert_eq!(err.code, ErrorCode::CreditLimitExceeded);
    }
}
