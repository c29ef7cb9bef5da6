//! # Settlement Commands
//!
//! Closing an order and collecting installments on credit orders.
//!
//! ```text
//! settle_order
//!   1. load order, its client and every product it sells
//!   2. optional override: SessionContext::authorize_credit(password)
//!   3. caja_core::settle(...) → SettlementPlan      (pure, validates all)
//!   4. DataAccess::commit_settlement(plan)          (one transaction)
//!   5. publish order / product / client changes
//! ```
//!
//! Nothing is written unless step 4 succeeds as a whole.

use serde::Serialize;
use tracing::{debug, info};

use crate::commands::order_client;
use crate::error::{ApiError, ErrorCode};
use crate::state::{ChangeEvent, DbState, Notifier, SessionContext};
use caja_core::{
    settle, settle_installment, CoreError, Money, OrderStatus, PaymentMethod, PaymentRecord,
    Product, SettlementPlan,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
    pub order_id: String,
    pub status: OrderStatus,
    pub method: String,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    pub remaining_cents: i64,
    pub change_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorized_by: Option<String>,
    pub payments: Vec<PaymentRecord>,
}

impl SettlementResponse {
    fn from_plan(plan: SettlementPlan, method: &PaymentMethod) -> Self {
        SettlementResponse {
            order_id: plan.order_id,
            status: plan.new_status,
            method: method.name().to_string(),
            total_cents: plan.order_total.cents(),
            amount_paid_cents: plan.amount_paid.cents(),
            remaining_cents: plan.remaining_balance.cents(),
            change_cents: plan.change.cents(),
            authorized_by: plan.authorized_by,
            payments: plan.payments,
        }
    }
}

/// Settles a draft order.
///
/// ## Outcomes
/// - Cash, card, transfer: `paid`
/// - Credit: `pending`, client balance grows by the total
/// - Mixed: `paid` without credit, `pending` when all credit,
///   `partially_paid` otherwise
///
/// ## Credit Above the Limit
/// Without `authorization` the command fails with `CREDIT_LIMIT_EXCEEDED`.
/// Retrying with the administrative password settles the order and records
/// the operator who authorized it.
pub async fn settle_order(
    db: &DbState,
    session: &SessionContext,
    notifier: &Notifier,
    order_id: &str,
    method: PaymentMethod,
    authorization: Option<&str>,
) -> Result<SettlementResponse, ApiError> {
    debug!(order_id = %order_id, method = method.name(), "settle command");

    let order = db.inner().get_order(order_id).await?;
    let client = order_client(db, &order).await?;

    let mut products: Vec<Product> = Vec::new();
    for (product_id, _) in order.quantities_by_product() {
        products.push(db.inner().get_product(&product_id).await?);
    }

    let grant = authorization
        .map(|password| session.authorize_credit(password))
        .transpose()?;

    let plan = settle(&order, client.as_ref(), &products, &method, grant.as_ref())
        .map_err(|e| match e {
            CoreError::CreditLimitExceeded { .. } => {
                let mut err = ApiError::from(e);
                err.message.push_str(" (retry with an administrative authorization)");
                err
            }
            other => ApiError::from(other),
        })?;

    db.inner().commit_settlement(&plan).await?;
    publish_plan(notifier, &plan);

    info!(
        order_id = %order_id,
        method = method.name(),
        status = %plan.new_status,
        total = %plan.order_total,
        "Order settled"
    );

    Ok(SettlementResponse::from_plan(plan, &method))
}

/// Takes an installment (abono) on a pending or partially paid order.
pub async fn pay_installment(
    db: &DbState,
    notifier: &Notifier,
    order_id: &str,
    amount: Money,
    tender: PaymentMethod,
) -> Result<SettlementResponse, ApiError> {
    debug!(order_id = %order_id, amount = %amount, method = tender.name(), "pay command");

    let order = db.inner().get_order(order_id).await?;
    let client = order_client(db, &order).await?;

    let plan = settle_installment(&order, client.as_ref(), amount, &tender)?;
    db.inner().commit_settlement(&plan).await?;
    publish_plan(notifier, &plan);

    info!(
        order_id = %order_id,
        amount = %amount,
        remaining = %plan.remaining_balance,
        "Installment recorded"
    );

    Ok(SettlementResponse::from_plan(plan, &tender))
}

/// Payment history of an order, oldest first.
pub async fn list_payments(db: &DbState, order_id: &str) -> Result<Vec<PaymentRecord>, ApiError> {
    debug!(order_id = %order_id, "payments command");
    // Unknown orders are an error, not an empty history
    db.inner().get_order(order_id).await?;
    Ok(db.inner().list_payments(order_id).await?)
}

fn publish_plan(notifier: &Notifier, plan: &SettlementPlan) {
    notifier.publish(ChangeEvent::order(plan.order_id.as_str()));
    notifier.publish_all(
        plan.stock_decrements
            .iter()
            .map(|d| ChangeEvent::product(d.product_id.as_str())),
    );
    if let Some(change) = &plan.balance_change {
        notifier.publish(ChangeEvent::client(change.client_id.as_str()));
    }
}

/// Builds the tender of a settlement from command-line style inputs.
///
/// Cash needs `received`; mixed uses the breakdown.
pub fn payment_method(
    kind: &str,
    received: Option<Money>,
    reference: Option<String>,
    breakdown: caja_core::PaymentBreakdown,
) -> Result<PaymentMethod, ApiError> {
    match kind {
        "cash" => received
            .map(|received| PaymentMethod::Cash { received })
            .ok_or_else(|| ApiError::validation("Cash payment requires the amount received")),
        "card" => Ok(PaymentMethod::Card { reference }),
        "transfer" => Ok(PaymentMethod::Transfer { reference }),
        "credit" => Ok(PaymentMethod::Credit),
        "mixed" => Ok(PaymentMethod::Mixed(breakdown)),
        other => Err(ApiError::new(
            ErrorCode::ValidationError,
            format!("Unknown payment method: {}", other),
        )),
    }
}
