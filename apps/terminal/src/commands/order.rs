//! # Order Commands
//!
//! Draft editing for the cashier screen.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Order Lifecycle                                      │
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────────────────────────┐    │
//! │  │new_order │────►│  Draft   │────►│ settle (settlement.rs)       │    │
//! │  └──────────┘     └──────────┘     │ paid | pending | partially   │    │
//! │                        │           └──────────────────────────────┘    │
//! │                   add_item                                              │
//! │                   add_weighed                                           │
//! │                   remove_item                                           │
//! │                   update_quantity / update_price                       │
//! │                   apply_discount / set_client                          │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                   cancel_order ────────────────────► Cancelled         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every edit loads the stored draft, applies the core mutation and saves the
//! draft back only when the mutation succeeded.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::commands::order_client;
use crate::error::ApiError;
use crate::state::{ChangeEvent, DbState, Notifier};
use caja_core::pricing::effective_level;
use caja_core::tare::weigh;
use caja_core::{Money, Order, OrderStatus, PriceLevel, Product, Quantity};

/// An order with its computed totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    /// Line touched by the command, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_id: Option<String>,
    pub order: Order,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub remaining_cents: i64,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        OrderResponse {
            line_id: None,
            subtotal_cents: order.subtotal().cents(),
            discount_cents: order.discount_total.cents(),
            total_cents: order.total().cents(),
            remaining_cents: order.remaining_balance().cents(),
            order,
        }
    }
}

impl OrderResponse {
    fn with_line(mut self, line_id: String) -> Self {
        self.line_id = Some(line_id);
        self
    }
}

/// Product to add by code.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_code: String,
    pub quantity: Quantity,
    /// Tier 1-5; the client's default tier when absent
    pub price_level: Option<i64>,
    /// Manual unit price; wins over the tier when positive
    pub unit_price: Option<Money>,
}

/// Product weighed on the scale.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeighRequest {
    pub product_code: String,
    pub gross_weight: Quantity,
    /// Container from the tare catalogue; `None` weighs without one
    pub tare_id: Option<String>,
    pub box_count: u32,
    pub price_level: Option<i64>,
    pub unit_price: Option<Money>,
}

// =============================================================================
// Queries
// =============================================================================

/// Starts a new draft, optionally for a client.
pub async fn new_order(
    db: &DbState,
    notifier: &Notifier,
    client_id: Option<&str>,
    notes: Option<String>,
) -> Result<OrderResponse, ApiError> {
    debug!(client_id = ?client_id, "new_order command");

    let mut order = match client_id {
        Some(id) => Order::for_client(&db.inner().get_client(id).await?),
        None => Order::new(),
    };
    order.notes = notes;

    let order = db.inner().create_order(&order).await?;
    info!(order_id = %order.id, "Order created");
    notifier.publish(ChangeEvent::order(order.id.as_str()));

    Ok(OrderResponse::from(order))
}

pub async fn show_order(db: &DbState, order_id: &str) -> Result<OrderResponse, ApiError> {
    debug!(order_id = %order_id, "show_order command");
    Ok(OrderResponse::from(db.inner().get_order(order_id).await?))
}

/// Open tabs: drafts plus credit orders awaiting collection.
pub async fn list_open(db: &DbState) -> Result<Vec<OrderResponse>, ApiError> {
    debug!("list_open command");
    let orders = db.inner().list_open_orders().await?;
    Ok(orders.into_iter().map(OrderResponse::from).collect())
}

// =============================================================================
// Line edits
// =============================================================================

/// Adds a product by code.
///
/// ## Behavior
/// - Same product, same tier, same unit price: the existing line grows
/// - Anything else: a new line is appended
/// - The unit price is frozen on the line at this moment
pub async fn add_item(
    db: &DbState,
    notifier: &Notifier,
    order_id: &str,
    request: AddItemRequest,
) -> Result<OrderResponse, ApiError> {
    debug!(
        order_id = %order_id,
        code = %request.product_code,
        quantity = %request.quantity,
        "add_item command"
    );

    let mut order = db.inner().get_order(order_id).await?;
    let product = sellable_product(db, &request.product_code).await?;
    let level = line_level(db, &order, request.price_level).await?;

    let line_id = order.add_item(&product, request.quantity, level, request.unit_price)?;
    persist(db, notifier, &order).await?;

    Ok(OrderResponse::from(order).with_line(line_id))
}

/// Adds a weighed product; the net weight becomes the line quantity.
///
/// ## Weighing
/// ```text
/// net = gross - tare × boxes
///     ≤ 0      → NON_POSITIVE_NET_WEIGHT
///     > stock  → INSUFFICIENT_STOCK (advisory; settle re-checks)
/// ```
pub async fn add_weighed(
    db: &DbState,
    notifier: &Notifier,
    order_id: &str,
    request: WeighRequest,
) -> Result<OrderResponse, ApiError> {
    debug!(
        order_id = %order_id,
        code = %request.product_code,
        gross = %request.gross_weight,
        boxes = request.box_count,
        "add_weighed command"
    );

    let mut order = db.inner().get_order(order_id).await?;
    let product = sellable_product(db, &request.product_code).await?;
    let tare = match &request.tare_id {
        Some(id) => Some(db.inner().get_tare_option(id).await?),
        None => None,
    };
    let level = line_level(db, &order, request.price_level).await?;

    let selection = weigh(&product, tare.as_ref(), request.box_count, request.gross_weight)?;
    let line_id = order.add_weighed_item(&product, selection, level, request.unit_price)?;
    persist(db, notifier, &order).await?;

    Ok(OrderResponse::from(order).with_line(line_id))
}

pub async fn remove_item(
    db: &DbState,
    notifier: &Notifier,
    order_id: &str,
    line_id: &str,
) -> Result<OrderResponse, ApiError> {
    debug!(order_id = %order_id, line_id = %line_id, "remove_item command");

    let mut order = db.inner().get_order(order_id).await?;
    order.remove_item(line_id)?;
    persist(db, notifier, &order).await?;

    Ok(OrderResponse::from(order))
}

pub async fn update_quantity(
    db: &DbState,
    notifier: &Notifier,
    order_id: &str,
    line_id: &str,
    quantity: Quantity,
) -> Result<OrderResponse, ApiError> {
    debug!(order_id = %order_id, line_id = %line_id, quantity = %quantity, "update_quantity command");

    let mut order = db.inner().get_order(order_id).await?;
    order.update_quantity(line_id, quantity)?;
    persist(db, notifier, &order).await?;

    Ok(OrderResponse::from(order).with_line(line_id.to_string()))
}

/// Re-prices a line from a tier or a manual price.
///
/// Without `price_level` the line keeps its current tier.
pub async fn update_price(
    db: &DbState,
    notifier: &Notifier,
    order_id: &str,
    line_id: &str,
    price_level: Option<i64>,
    unit_price: Option<Money>,
) -> Result<OrderResponse, ApiError> {
    debug!(order_id = %order_id, line_id = %line_id, "update_price command");

    let mut order = db.inner().get_order(order_id).await?;
    let line = order
        .line(line_id)
        .ok_or_else(|| ApiError::not_found("Order line", line_id))?;
    let level = match price_level {
        Some(n) => PriceLevel::new(n)?,
        None => line.price_level,
    };
    let product = db.inner().get_product(&line.product_id).await?;

    order.update_item_price(line_id, &product, level, unit_price)?;
    persist(db, notifier, &order).await?;

    Ok(OrderResponse::from(order).with_line(line_id.to_string()))
}

/// Sets the order-level discount. A zero amount removes it.
pub async fn apply_discount(
    db: &DbState,
    notifier: &Notifier,
    order_id: &str,
    amount: Money,
) -> Result<OrderResponse, ApiError> {
    debug!(order_id = %order_id, amount = %amount, "apply_discount command");

    let mut order = db.inner().get_order(order_id).await?;
    if amount.is_zero() {
        order.clear_discount()?;
    } else {
        order.apply_discount(amount)?;
    }
    persist(db, notifier, &order).await?;

    Ok(OrderResponse::from(order))
}

/// Attaches a client, or turns the draft back into a walk-in sale.
pub async fn set_client(
    db: &DbState,
    notifier: &Notifier,
    order_id: &str,
    client_id: Option<&str>,
) -> Result<OrderResponse, ApiError> {
    debug!(order_id = %order_id, client_id = ?client_id, "set_client command");

    let mut order = db.inner().get_order(order_id).await?;
    match client_id {
        Some(id) => {
            let client = db.inner().get_client(id).await?;
            order.set_client(&client)?;
        }
        None => order.clear_client()?,
    }
    persist(db, notifier, &order).await?;

    Ok(OrderResponse::from(order))
}

/// Abandons a draft or an uncollected credit order.
pub async fn cancel_order(
    db: &DbState,
    notifier: &Notifier,
    order_id: &str,
) -> Result<OrderResponse, ApiError> {
    debug!(order_id = %order_id, "cancel_order command");

    let mut order = db.inner().get_order(order_id).await?;
    order.cancel()?;
    db.inner()
        .update_order_status(order.id.as_str(), OrderStatus::Cancelled)
        .await?;

    info!(order_id = %order_id, "Order cancelled");
    notifier.publish(ChangeEvent::order(order_id));

    Ok(OrderResponse::from(order))
}

// =============================================================================
// Helpers
// =============================================================================

async fn sellable_product(db: &DbState, code: &str) -> Result<Product, ApiError> {
    let product = db.inner().find_product_by_code(code).await?;
    if !product.is_active {
        return Err(ApiError::validation(format!(
            "Product {} is not available for sale",
            code
        )));
    }
    Ok(product)
}

/// Explicit tier, else the order client's default, else general.
async fn line_level(
    db: &DbState,
    order: &Order,
    explicit: Option<i64>,
) -> Result<PriceLevel, ApiError> {
    if let Some(n) = explicit {
        return Ok(PriceLevel::new(n)?);
    }
    let client = order_client(db, order).await?;
    Ok(effective_level(None, client.as_ref()))
}

async fn persist(db: &DbState, notifier: &Notifier, order: &Order) -> Result<(), ApiError> {
    db.inner().save_order(order).await?;
    notifier.publish(ChangeEvent::order(order.id.as_str()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support::Fixture;

    fn item(code: &str, quantity: &str) -> AddItemRequest {
        AddItemRequest {
            product_code: code.to_string(),
            quantity: quantity.parse().unwrap(),
            price_level: None,
            unit_price: None,
        }
    }

    #[tokio::test]
    async fn test_add_item_merges_same_product_and_tier() {
        let fx = Fixture::new().await;
        fx.product("AZUC-01", 50, 3_000).await;
        let order = new_order(&fx.db, &fx.notifier, None, None).await.unwrap();
        let id = order.order.id.to_string();

        let first = add_item(&fx.db, &fx.notifier, &id, item("AZUC-01", "2"))
            .await
            .unwrap();
        let second = add_item(&fx.db, &fx.notifier, &id, item("AZUC-01", "1.5"))
            .await
            .unwrap();

        assert_eq!(first.line_id, second.line_id);
        assert_eq!(second.order.items.len(), 1);
        assert_eq!(second.order.items[0].quantity, Quantity::from_millis(3_500));
        assert_eq!(second.total_cents, 10_500);

        let stored = show_order(&fx.db, &id).await.unwrap();
        assert_eq!(stored.total_cents, 10_500);
    }

    #[tokio::test]
    async fn test_client_default_tier_and_explicit_tier() {
        let fx = Fixture::new().await;
        fx.product("CHILE-01", 50, 16_000).await;
        let client = fx.client("Fonda Dona Mary", 100_000, 0).await;
        let order = new_order(&fx.db, &fx.notifier, Some(&client.id), None)
            .await
            .unwrap();
        let id = order.order.id.to_string();

        // client default is level 2: $159.00
        let resp = add_item(&fx.db, &fx.notifier, &id, item("CHILE-01", "1"))
            .await
            .unwrap();
        assert_eq!(resp.total_cents, 15_900);

        let mut explicit = item("CHILE-01", "1");
        explicit.price_level = Some(1);
        let resp = add_item(&fx.db, &fx.notifier, &id, explicit).await.unwrap();
        assert_eq!(resp.order.items.len(), 2);
        assert_eq!(resp.total_cents, 15_900 + 16_000);
    }

    #[tokio::test]
    async fn test_invalid_price_level_leaves_order_untouched() {
        let fx = Fixture::new().await;
        fx.product("ARROZ-01", 50, 3_400).await;
        let order = new_order(&fx.db, &fx.notifier, None, None).await.unwrap();
        let id = order.order.id.to_string();

        let mut bad = item("ARROZ-01", "1");
        bad.price_level = Some(6);
        let err = add_item(&fx.db, &fx.notifier, &id, bad).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPriceLevel);

        assert!(show_order(&fx.db, &id).await.unwrap().order.items.is_empty());
    }

    #[tokio::test]
    async fn test_weighed_item_over_stock_is_rejected() {
        let fx = Fixture::new().await;
        fx.product("NUEZ-01", 40, 32_000).await;
        let crate_tare = fx.tare("Caja", 2_500).await;
        let order = new_order(&fx.db, &fx.notifier, None, None).await.unwrap();
        let id = order.order.id.to_string();

        // 50 - 2.5 × 3 = 42.5 kg > 40 kg in stock
        let request = WeighRequest {
            product_code: "NUEZ-01".to_string(),
            gross_weight: Quantity::from_units(50),
            tare_id: Some(crate_tare.id.clone()),
            box_count: 3,
            price_level: None,
            unit_price: None,
        };
        let err = add_weighed(&fx.db, &fx.notifier, &id, request)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        // 30 - 2.5 × 2 = 25 kg
        let request = WeighRequest {
            product_code: "NUEZ-01".to_string(),
            gross_weight: Quantity::from_units(30),
            tare_id: Some(crate_tare.id),
            box_count: 2,
            price_level: None,
            unit_price: None,
        };
        let resp = add_weighed(&fx.db, &fx.notifier, &id, request).await.unwrap();
        let line = &resp.order.items[0];
        assert_eq!(line.quantity, Quantity::from_units(25));
        assert!(line.tare.is_some());
        assert_eq!(resp.total_cents, 800_000);
    }

    #[tokio::test]
    async fn test_discount_is_clamped_when_lines_shrink() {
        let fx = Fixture::new().await;
        fx.product("FRIJ-01", 50, 4_000).await;
        let order = new_order(&fx.db, &fx.notifier, None, None).await.unwrap();
        let id = order.order.id.to_string();

        let resp = add_item(&fx.db, &fx.notifier, &id, item("FRIJ-01", "3"))
            .await
            .unwrap();
        let line_id = resp.line_id.unwrap();

        apply_discount(&fx.db, &fx.notifier, &id, Money::from_cents(10_000))
            .await
            .unwrap();
        let resp = update_quantity(&fx.db, &fx.notifier, &id, &line_id, Quantity::from_units(2))
            .await
            .unwrap();

        assert_eq!(resp.discount_cents, 8_000);
        assert_eq!(resp.total_cents, 0);

        let err = apply_discount(&fx.db, &fx.notifier, &id, Money::from_cents(9_000))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidDiscount);
    }

    #[tokio::test]
    async fn test_update_price_and_remove_item() {
        let fx = Fixture::new().await;
        fx.product("SAL-01", 50, 1_200).await;
        let order = new_order(&fx.db, &fx.notifier, None, None).await.unwrap();
        let id = order.order.id.to_string();

        let resp = add_item(&fx.db, &fx.notifier, &id, item("SAL-01", "2"))
            .await
            .unwrap();
        let line_id = resp.line_id.unwrap();

        let resp = update_price(
            &fx.db,
            &fx.notifier,
            &id,
            &line_id,
            None,
            Some(Money::from_cents(1_000)),
        )
        .await
        .unwrap();
        assert!(resp.order.items[0].custom_price);
        assert_eq!(resp.total_cents, 2_000);

        let resp = remove_item(&fx.db, &fx.notifier, &id, &line_id).await.unwrap();
        assert!(resp.order.items.is_empty());

        let err = remove_item(&fx.db, &fx.notifier, &id, &line_id)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::LineNotFound);
    }

    #[tokio::test]
    async fn test_cancel_removes_from_open_list_and_notifies() {
        let fx = Fixture::new().await;
        fx.product("HARINA-01", 50, 2_200).await;
        let mut rx = fx.notifier.subscribe();
        let order = new_order(&fx.db, &fx.notifier, None, None).await.unwrap();
        let id = order.order.id.to_string();
        assert_eq!(list_open(&fx.db).await.unwrap().len(), 1);

        let resp = cancel_order(&fx.db, &fx.notifier, &id).await.unwrap();
        assert_eq!(resp.order.status, OrderStatus::Cancelled);
        assert!(list_open(&fx.db).await.unwrap().is_empty());

        assert_eq!(rx.recv().await.unwrap(), ChangeEvent::order(id.as_str()));
        assert_eq!(rx.recv().await.unwrap(), ChangeEvent::order(id.as_str()));

        let err = add_item(&fx.db, &fx.notifier, &id, item("HARINA-01", "1"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidOrderStatus);
    }
}
