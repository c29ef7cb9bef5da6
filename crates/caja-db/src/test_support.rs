//! Fixtures shared by the repository tests.

use chrono::Utc;
use uuid::Uuid;

use caja_core::{Client, Money, PriceLevel, Product, Quantity};

/// A kg product priced $20.00 at level 1, $1.00 less per level.
pub(crate) fn sample_product(code: &str, stock_units: i64) -> Product {
    let now = Utc::now();
    Product {
        id: Uuid::new_v4().to_string(),
        code: code.to_string(),
        name: format!("Producto {}", code),
        line: Some("Abarrotes".to_string()),
        subline: None,
        unit: "kg".to_string(),
        stock: Quantity::from_units(stock_units),
        cost: Money::from_cents(1000),
        prices: [
            Money::from_cents(2000),
            Money::from_cents(1900),
            Money::from_cents(1800),
            Money::from_cents(1700),
            Money::from_cents(1600),
        ],
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

/// A client on price level 2.
pub(crate) fn sample_client(name: &str, limit_cents: i64, balance_cents: i64) -> Client {
    let now = Utc::now();
    Client {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        credit_limit: Money::from_cents(limit_cents),
        balance: Money::from_cents(balance_cents),
        default_price_level: PriceLevel::new(2).unwrap(),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
