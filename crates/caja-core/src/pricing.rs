//! # Pricing Resolver
//!
//! Determines the unit price of an order line.
//!
//! ```text
//! custom price > 0 ? ──yes──► custom price   (admin free pricing)
//!        │
//!        no
//!        ▼
//! product.prices[level]      (price1 … price5)
//! ```
//!
//! Level validation happens when the [`PriceLevel`] is built, so an
//! out-of-range tier never reaches this module.

use crate::money::Money;
use crate::types::{Client, PriceLevel, Product};

/// Resolves the effective unit price for a product.
///
/// ## Example
/// ```rust,ignore
/// let price = resolve_price(&product, PriceLevel::new(2)?, None);
/// assert_eq!(price, product.prices[1]);
/// ```
pub fn resolve_price(product: &Product, level: PriceLevel, custom_price: Option<Money>) -> Money {
    match custom_price {
        Some(custom) if custom.is_positive() => custom,
        _ => product.price(level),
    }
}

/// Picks the price level for a new line: explicit choice, then the client's
/// default, then the general tier.
pub fn effective_level(explicit: Option<PriceLevel>, client: Option<&Client>) -> PriceLevel {
    explicit
        .or_else(|| client.map(|c| c.default_price_level))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::Quantity;
    use chrono::Utc;

    fn product() -> Product {
        Product {
            id: "p1".to_string(),
            code: "AZUC-01".to_string(),
            name: "Azucar estandar".to_string(),
            line: None,
            subline: None,
            unit: "kg".to_string(),
            stock: Quantity::from_units(100),
            cost: Money::from_cents(2000),
            prices: [
                Money::from_cents(3000),
                Money::from_cents(2900),
                Money::from_cents(2800),
                Money::from_cents(2700),
                Money::from_cents(2600),
            ],
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn client(level: i64) -> Client {
        Client {
            id: "c1".to_string(),
            name: "Abarrotes Lupita".to_string(),
            credit_limit: Money::from_cents(500_000),
            balance: Money::zero(),
            default_price_level: PriceLevel::new(level).unwrap(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_tier_lookup() {
        let p = product();
        for level in 1..=5 {
            let lvl = PriceLevel::new(level).unwrap();
            assert_eq!(resolve_price(&p, lvl, None), p.prices[(level - 1) as usize]);
        }
    }

    #[test]
    fn test_custom_price_wins_when_positive() {
        let p = product();
        let custom = Money::from_cents(1234);
        assert_eq!(resolve_price(&p, PriceLevel::GENERAL, Some(custom)), custom);
    }

    #[test]
    fn test_non_positive_custom_price_falls_back() {
        let p = product();
        assert_eq!(
            resolve_price(&p, PriceLevel::GENERAL, Some(Money::zero())),
            p.prices[0]
        );
        assert_eq!(
            resolve_price(&p, PriceLevel::GENERAL, Some(Money::from_cents(-10))),
            p.prices[0]
        );
    }

    #[test]
    fn test_effective_level() {
        let c = client(4);
        let three = PriceLevel::new(3).unwrap();

        assert_eq!(effective_level(Some(three), Some(&c)), three);
        assert_eq!(effective_level(None, Some(&c)).get(), 4);
        assert_eq!(effective_level(None, None), PriceLevel::GENERAL);
    }
}
