//! # Credit Policy Guard
//!
//! Decides whether a credit charge fits the client's limit.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  check_credit(client, amount)                                           │
//! │                                                                         │
//! │  no client ───────────────────────────► NoClientForCredit (hard)       │
//! │  balance + amount <= credit_limit ────► Allow                          │
//! │  otherwise ───────────────────────────► RequireAuthorization           │
//! │                                           │                             │
//! │                                           ▼                             │
//! │                          terminal asks for the admin password           │
//! │                          SessionContext → CreditOverride                │
//! │                          settle(..., Some(override))                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The guard only flags the need for authorisation. Verifying the
//! administrative credential is the terminal's job.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Client;

/// Outcome of a credit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum CreditDecision {
    Allow,
    /// The charge exceeds the limit by `shortfall`.
    RequireAuthorization { available: Money, shortfall: Money },
}

impl CreditDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CreditDecision::Allow)
    }
}

/// Proof that an administrator approved exceeding a credit limit.
///
/// Only the terminal's session context creates one, after checking the
/// administrative password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditOverride {
    authorized_by: String,
}

impl CreditOverride {
    pub fn new(authorized_by: impl Into<String>) -> Self {
        CreditOverride {
            authorized_by: authorized_by.into(),
        }
    }

    pub fn authorized_by(&self) -> &str {
        &self.authorized_by
    }
}

/// Checks a proposed credit charge against the client's limit.
///
/// ## Example
/// ```rust
/// # use caja_core::credit::{check_credit, CreditDecision};
/// # use caja_core::money::Money;
/// # use caja_core::types::{Client, PriceLevel};
/// # use chrono::Utc;
/// let client = Client {
///     id: "c1".into(),
///     name: "Abarrotes Lupita".into(),
///     credit_limit: Money::from_cents(500_000),
///     balance: Money::from_cents(480_000),
///     default_price_level: PriceLevel::GENERAL,
///     is_active: true,
///     created_at: Utc::now(),
///     updated_at: Utc::now(),
/// };
///
/// let decision = check_credit(Some(&client), Money::from_cents(30_000)).unwrap();
/// assert!(!decision.is_allowed());
/// ```
pub fn check_credit(client: Option<&Client>, amount: Money) -> CoreResult<CreditDecision> {
    let client = client.ok_or(CoreError::NoClientForCredit)?;

    if client.balance + amount <= client.credit_limit {
        return Ok(CreditDecision::Allow);
    }

    let available = client.available_credit();
    Ok(CreditDecision::RequireAuthorization {
        available,
        shortfall: amount - available,
    })
}

/// Runs the guard and turns an unapproved excess into
/// [`CoreError::CreditLimitExceeded`].
pub(crate) fn authorize_credit(
    client: Option<&Client>,
    amount: Money,
    credit_override: Option<&CreditOverride>,
) -> CoreResult<()> {
    match check_credit(client, amount)? {
        CreditDecision::Allow => Ok(()),
        CreditDecision::RequireAuthorization { .. } if credit_override.is_some() => Ok(()),
        CreditDecision::RequireAuthorization { .. } => {
            // check_credit already rejected a missing client
            let client = client.ok_or(CoreError::NoClientForCredit)?;
            Err(CoreError::CreditLimitExceeded {
                client: client.name.clone(),
                limit: client.credit_limit,
                balance: client.balance,
                requested: amount,
            })
        }
    }
}
