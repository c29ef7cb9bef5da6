//! # Credit Commands
//!
//! Read-only credit checks. The guard never authorizes anything by itself:
//! a `require_authorization` answer means settling on credit needs the
//! administrative password.

use serde::Serialize;
use tracing::debug;

use crate::commands::order_client;
use crate::error::ApiError;
use crate::state::DbState;
use caja_core::{check_credit, Client, CoreError, CreditDecision, Money};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCheckResponse {
    pub client_id: String,
    pub client_name: String,
    pub amount_cents: i64,
    pub balance_cents: i64,
    pub credit_limit_cents: i64,
    pub available_cents: i64,
    #[serde(flatten)]
    pub decision: CreditDecision,
}

impl CreditCheckResponse {
    fn new(client: &Client, amount: Money, decision: CreditDecision) -> Self {
        CreditCheckResponse {
            client_id: client.id.clone(),
            client_name: client.name.clone(),
            amount_cents: amount.cents(),
            balance_cents: client.balance.cents(),
            credit_limit_cents: client.credit_limit.cents(),
            available_cents: client.available_credit().cents(),
            decision,
        }
    }
}

/// Would charging `amount` to this client's account stay within the limit?
///
/// ## Returns
/// * `Err(NO_CLIENT_FOR_CREDIT)` - no client given
pub async fn check_client_credit(
    db: &DbState,
    client_id: Option<&str>,
    amount: Money,
) -> Result<CreditCheckResponse, ApiError> {
    debug!(client_id = ?client_id, amount = %amount, "check_credit command");

    let client = match client_id {
        Some(id) => Some(db.inner().get_client(id).await?),
        None => None,
    };
    respond(client.as_ref(), amount)
}

/// Credit check for settling an order's full total on credit.
pub async fn check_order_credit(
    db: &DbState,
    order_id: &str,
) -> Result<CreditCheckResponse, ApiError> {
    debug!(order_id = %order_id, "check_credit command");

    let order = db.inner().get_order(order_id).await?;
    let client = order_client(db, &order).await?;
    respond(client.as_ref(), order.total())
}

fn respond(client: Option<&Client>, amount: Money) -> Result<CreditCheckResponse, ApiError> {
    let client = client.ok_or(CoreError::NoClientForCredit)?;
    let decision = check_credit(Some(client), amount)?;
    Ok(CreditCheckResponse::new(client, amount, decision))
}
