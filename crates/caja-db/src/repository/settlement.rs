//! # Settlement Repository
//!
//! Commits a [`SettlementPlan`] in one SQLite transaction.
//!
//! ```text
//! BEGIN
//!   UPDATE orders        status/amount_paid   WHERE status, paid, total,   ─┐
//!                                                   client as planned       │
//!   SELECT order_lines   Σ qty per product   == plan (drafts)               │
//!   UPDATE products      stock - qty          WHERE stock >= qty  (each)    │ any guard
//!   UPDATE clients       balance + delta      WHERE within limit            │ fails →
//!   INSERT payments      (each)                                             │ ROLLBACK
//!   INSERT cash_movements                                                  ─┘
//! COMMIT
//! ```

use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{info, warn};

use crate::error::DbResult;
use crate::repository::cash::insert_cash_movement;
use crate::repository::client::adjust_balance;
use crate::repository::order::apply_settlement;
use crate::repository::payment::insert_payment;
use crate::repository::product::decrement_stock;
use caja_core::SettlementPlan;

#[derive(Debug, Clone)]
pub struct SettlementRepository {
    pool: SqlitePool,
}

impl SettlementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettlementRepository { pool }
    }

    /// Applies every staged write of `plan`, or none of them.
    ///
    /// ## Returns
    /// * `Err(DbError::InsufficientStock)` - a stock compare-and-set failed
    /// * `Err(DbError::CreditLimitExceeded)` - an unauthorized charge no
    ///   longer fits the client's limit
    /// * `Err(DbError::Conflict)` - the order changed since the plan was built
    pub async fn commit(&self, plan: &SettlementPlan) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        // Dropping `tx` on error rolls everything back.
        if let Err(e) = stage(&mut tx, plan).await {
            warn!(order_id = %plan.order_id, error = %e, "Settlement rolled back");
            return Err(e);
        }

        tx.commit().await?;

        info!(
            order_id = %plan.order_id,
            status = %plan.new_status,
            paid = %plan.amount_paid,
            remaining = %plan.remaining_balance,
            "Settlement committed"
        );
        Ok(())
    }
}

async fn stage(tx: &mut Transaction<'_, Sqlite>, plan: &SettlementPlan) -> DbResult<()> {
    // Header first: a stale plan stops before touching stock.
    apply_settlement(tx, plan).await?;

    for decrement in &plan.stock_decrements {
        decrement_stock(tx, &decrement.product_id, decrement.quantity, plan.settled_at).await?;
    }

    if let Some(change) = &plan.balance_change {
        let enforce_limit = plan.authorized_by.is_none();
        adjust_balance(tx, &change.client_id, change.delta, enforce_limit, plan.settled_at)
            .await?;
    }

    for payment in &plan.payments {
        insert_payment(tx, payment).await?;
    }

    if let Some(movement) = &plan.cash_movement {
        insert_cash_movement(tx, movement).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use crate::test_support::{sample_client, sample_product};
    use caja_core::{
        settle, settle_installment, CreditOverride, Money, Order, OrderStatus, PaymentKind,
        PaymentMethod, PriceLevel, Quantity,
    };

    /// Saved draft: 2 × $20.00 of `product`.
    async fn saved_order(db: &Database, product: &caja_core::Product) -> Order {
        let mut order = db.orders().create(&Order::new()).await.unwrap();
        order
            .add_item(product, Quantity::from_units(2), PriceLevel::GENERAL, None)
            .unwrap();
        db.orders().save(&order).await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_cash_settlement_commits_every_write() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = sample_product("AZUC-01", 10);
        db.products().insert(&product).await.unwrap();
        let order = saved_order(&db, &product).await;

        let method = PaymentMethod::Cash {
            received: Money::from_cents(5_000),
        };
        let plan = settle(&order, None, &[product.clone()], &method, None).unwrap();
        db.settlements().commit(&plan).await.unwrap();

        let stored = db.orders().get_by_id(order.id.as_str()).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Paid);
        assert_eq!(stored.amount_paid.cents(), 4_000);

        let stock = db.products().get_by_id(&product.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, Quantity::from_units(8));

        let payments = db.payments().list_for_order(order.id.as_str()).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].change, Some(Money::from_cents(1_000)));

        let movements = db.cash_movements().list_for_order(order.id.as_str()).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].amount.cents(), 4_000);
    }

    #[tokio::test]
    async fn test_lost_stock_race_rolls_back_everything() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = sample_product("NUEZ-01", 3);
        db.products().insert(&product).await.unwrap();
        let order = saved_order(&db, &product).await;

        let method = PaymentMethod::Cash {
            received: Money::from_cents(4_000),
        };
        let plan = settle(&order, None, &[product.clone()], &method, None).unwrap();

        // another terminal sells 2 of the 3 units first
        db.products()
            .update_stock(&product.id, Quantity::from_units(-2))
            .await
            .unwrap();

        let err = db.settlements().commit(&plan).await.unwrap_err();
        assert!(matches!(err, DbError::InsufficientStock { .. }));

        let stored = db.orders().get_by_id(order.id.as_str()).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Draft);
        assert_eq!(stored.amount_paid, Money::zero());
        assert!(db.payments().list_for_order(order.id.as_str()).await.unwrap().is_empty());
        assert!(db
            .cash_movements()
            .list_for_order(order.id.as_str())
            .await
            .unwrap()
            .is_empty());
        let stock = db.products().get_by_id(&product.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, Quantity::from_units(1));
    }

    /// The order is still an unpaid draft and `product` kept `stock` units.
    async fn assert_untouched(
        db: &Database,
        order: &Order,
        product: &caja_core::Product,
        stock: i64,
    ) {
        let stored = db.orders().get_by_id(order.id.as_str()).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Draft);
        assert_eq!(stored.amount_paid, Money::zero());
        assert!(db.payments().list_for_order(order.id.as_str()).await.unwrap().is_empty());
        let current = db.products().get_by_id(&product.id).await.unwrap().unwrap().stock;
        assert_eq!(current, Quantity::from_units(stock));
    }

    #[tokio::test]
    async fn test_plan_is_rejected_after_lines_change() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sugar = sample_product("AZUC-01", 100);
        let rice = sample_product("ARROZ-01", 100);
        db.products().insert(&sugar).await.unwrap();
        db.products().insert(&rice).await.unwrap();
        let products = [sugar.clone(), rice.clone()];
        let order = saved_order(&db, &sugar).await;

        let method = PaymentMethod::Cash {
            received: Money::from_cents(4_000),
        };
        let plan = settle(&order, None, &products, &method, None).unwrap();

        // another terminal adds 9 more before the payment is committed
        let mut other = db.orders().get_by_id(order.id.as_str()).await.unwrap().unwrap();
        other
            .add_item(&sugar, Quantity::from_units(9), PriceLevel::GENERAL, None)
            .unwrap();
        db.orders().save(&other).await.unwrap();

        let err = db.settlements().commit(&plan).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
        assert_untouched(&db, &order, &sugar, 100).await;

        // same total, different goods: 11 kg of rice instead of sugar
        let current = db.orders().get_by_id(order.id.as_str()).await.unwrap().unwrap();
        let method = PaymentMethod::Card { reference: None };
        let plan = settle(&current, None, &products, &method, None).unwrap();

        let mut other = current.clone();
        other.remove_item(&current.items[0].id).unwrap();
        other
            .add_item(&rice, Quantity::from_units(11), PriceLevel::GENERAL, None)
            .unwrap();
        assert_eq!(other.total(), current.total());
        db.orders().save(&other).await.unwrap();

        let err = db.settlements().commit(&plan).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
        assert_untouched(&db, &order, &rice, 100).await;

        // a plan built from what is stored now goes through
        let current = db.orders().get_by_id(order.id.as_str()).await.unwrap().unwrap();
        let plan = settle(&current, None, &products, &method, None).unwrap();
        db.settlements().commit(&plan).await.unwrap();
        let stock = db.products().get_by_id(&rice.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, Quantity::from_units(89));
    }

    #[tokio::test]
    async fn test_concurrent_credit_charges_cannot_pass_the_limit() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = sample_product("FRIJOL-01", 100);
        db.products().insert(&product).await.unwrap();
        let client = sample_client("Abarrotes Lupita", 500_000, 480_000);
        db.clients().insert(&client).await.unwrap();

        // three $80.00 credit sales, each checked against the same $4800.00 balance
        let mut orders = Vec::new();
        let mut plans = Vec::new();
        for _ in 0..3 {
            let mut order = db.orders().create(&Order::for_client(&client)).await.unwrap();
            order
                .add_item(&product, Quantity::from_units(4), PriceLevel::GENERAL, None)
                .unwrap();
            db.orders().save(&order).await.unwrap();

            let plan = settle(
                &order,
                Some(&client),
                &[product.clone()],
                &PaymentMethod::Credit,
                None,
            )
            .unwrap();
            orders.push(order);
            plans.push(plan);
        }

        db.settlements().commit(&plans[0]).await.unwrap();
        db.settlements().commit(&plans[1]).await.unwrap();
        let err = db.settlements().commit(&plans[2]).await.unwrap_err();
        assert!(matches!(err, DbError::CreditLimitExceeded { .. }));

        let stored = db.clients().get_by_id(&client.id).await.unwrap().unwrap();
        assert_eq!(stored.balance.cents(), 496_000);
        assert!(stored.balance <= stored.credit_limit);
        assert_untouched(&db, &orders[2], &product, 92).await;

        // with an administrator's approval the third sale goes through
        let token = CreditOverride::new("gerente");
        let plan = settle(
            &orders[2],
            Some(&stored),
            &[product.clone()],
            &PaymentMethod::Credit,
            Some(&token),
        )
        .unwrap();
        db.settlements().commit(&plan).await.unwrap();

        let stored = db.clients().get_by_id(&client.id).await.unwrap().unwrap();
        assert_eq!(stored.balance.cents(), 504_000);
    }

    #[tokio::test]
    async fn test_same_plan_cannot_commit_twice() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = sample_product("ARROZ-01", 10);
        db.products().insert(&product).await.unwrap();
        let order = saved_order(&db, &product).await;

        let method = PaymentMethod::Card { reference: None };
        let plan = settle(&order, None, &[product.clone()], &method, None).unwrap();
        db.settlements().commit(&plan).await.unwrap();

        let err = db.settlements().commit(&plan).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        let stock = db.products().get_by_id(&product.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, Quantity::from_units(8));
    }

    #[tokio::test]
    async fn test_credit_then_installments_clear_balance() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = sample_product("CHILE-01", 10);
        db.products().insert(&product).await.unwrap();
        let client = sample_client("Abarrotes Lupita", 500_000, 0);
        db.clients().insert(&client).await.unwrap();

        let mut order = db.orders().create(&Order::for_client(&client)).await.unwrap();
        order
            .add_item(&product, Quantity::from_units(2), PriceLevel::GENERAL, None)
            .unwrap();
        db.orders().save(&order).await.unwrap();

        let plan = settle(
            &order,
            Some(&client),
            &[product.clone()],
            &PaymentMethod::Credit,
            None,
        )
        .unwrap();
        db.settlements().commit(&plan).await.unwrap();

        let client = db.clients().get_by_id(&client.id).await.unwrap().unwrap();
        assert_eq!(client.balance.cents(), 4_000);

        for cents in [1_500, 2_500] {
            let order = db.orders().get_by_id(order.id.as_str()).await.unwrap().unwrap();
            let client = db.clients().get_by_id(&client.id).await.unwrap().unwrap();
            let tender = PaymentMethod::Transfer { reference: None };
            let plan =
                settle_installment(&order, Some(&client), Money::from_cents(cents), &tender)
                    .unwrap();
            db.settlements().commit(&plan).await.unwrap();
        }

        let order = db.orders().get_by_id(order.id.as_str()).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.remaining_balance(), Money::zero());

        let client = db.clients().get_by_id(&client.id).await.unwrap().unwrap();
        assert_eq!(client.balance, Money::zero());

        let payments = db.payments().list_for_order(order.id.as_str()).await.unwrap();
        assert_eq!(payments.len(), 3);
        assert_eq!(payments[0].kind, PaymentKind::Credit);
        assert_eq!(
            db.payments().total_collected(order.id.as_str()).await.unwrap().cents(),
            4_000
        );
    }
}
