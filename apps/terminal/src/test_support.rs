//! In-memory terminal for command tests.

use chrono::Utc;

use crate::state::{DbState, Notifier, SessionContext};
use caja_core::{Client, Money, PriceLevel, Product, Quantity, TareOption};
use caja_db::{Database, DbConfig};

pub(crate) const ADMIN_PASSWORD: &str = "gerente-2024";

pub(crate) struct Fixture {
    pub db: DbState,
    pub raw: Database,
    pub notifier: Notifier,
    pub session: SessionContext,
}

impl Fixture {
    pub async fn new() -> Self {
        let raw = Database::new(DbConfig::in_memory()).await.unwrap();
        Fixture {
            db: DbState::from_database(raw.clone()),
            raw,
            notifier: Notifier::new(32),
            session: SessionContext::new(
                "gerente",
                Some(crate::state::session::tests::hash(ADMIN_PASSWORD)),
            ),
        }
    }

    /// Product `code` with `stock_units` in stock, price1 = `price1_cents`,
    /// each later tier $1.00 cheaper.
    pub async fn product(&self, code: &str, stock_units: i64, price1_cents: i64) -> Product {
        let now = Utc::now();
        let product = Product {
            id: format!("prod-{}", code.to_lowercase()),
            code: code.to_string(),
            name: format!("Producto {}", code),
            line: None,
            subline: None,
            unit: "kg".to_string(),
            stock: Quantity::from_units(stock_units),
            cost: Money::from_cents(price1_cents / 2),
            prices: [0, 100, 200, 300, 400].map(|off| Money::from_cents(price1_cents - off)),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.raw.products().insert(&product).await.unwrap()
    }

    /// Client on price level 2.
    pub async fn client(&self, name: &str, limit_cents: i64, balance_cents: i64) -> Client {
        let now = Utc::now();
        let client = Client {
            id: format!("cli-{}", name.to_lowercase().replace(' ', "-")),
            name: name.to_string(),
            credit_limit: Money::from_cents(limit_cents),
            balance: Money::from_cents(balance_cents),
            default_price_level: PriceLevel::new(2).unwrap(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.raw.clients().insert(&client).await.unwrap()
    }

    pub async fn tare(&self, name: &str, grams: i64) -> TareOption {
        let tare = TareOption {
            id: format!("tare-{}", name.to_lowercase()),
            name: name.to_string(),
            weight: Quantity::from_millis(grams),
        };
        self.raw.tares().insert(&tare).await.unwrap();
        tare
    }
}
