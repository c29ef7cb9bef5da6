//! # Seed Data Generator
//!
//! Populates the database with a demo catalogue for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p caja-db --bin caja-seed
//!
//! # Specify database path
//! cargo run -p caja-db --bin caja-seed -- --db ./data/caja.db
//! ```
//!
//! ## Generated Data
//! - Products across five lines, sold by piece or by kg, each with five
//!   descending price tiers
//! - Clients with different credit limits and default tiers
//! - The usual weighing containers (crate, sack, box)

use chrono::Utc;
use std::env;
use uuid::Uuid;

use caja_core::validation::{validate_name, validate_product_code};
use caja_core::{Client, Money, PriceLevel, Product, Quantity, TareOption};
use caja_db::repository::product::generate_product_id;
use caja_db::{Database, DbConfig};

/// (code prefix, line, [(name, unit, price1 cents)])
const CATALOGUE: &[(&str, &str, &[(&str, &str, i64)])] = &[
    (
        "ABA",
        "Abarrotes",
        &[
            ("Azucar Estandar", "kg", 2_850),
            ("Arroz Morelos", "kg", 3_400),
            ("Frijol Negro", "kg", 3_900),
            ("Aceite Vegetal 1L", "pz", 4_500),
            ("Harina de Trigo", "kg", 2_200),
            ("Sal de Mesa", "pz", 1_200),
        ],
    ),
    (
        "CHI",
        "Chiles Secos",
        &[
            ("Chile Guajillo", "kg", 16_000),
            ("Chile Ancho", "kg", 18_500),
            ("Chile de Arbol", "kg", 21_000),
            ("Chile Pasilla", "kg", 19_500),
        ],
    ),
    (
        "SEM",
        "Semillas",
        &[
            ("Nuez Pecana", "kg", 32_000),
            ("Cacahuate Natural", "kg", 6_500),
            ("Pepita Verde", "kg", 24_000),
            ("Almendra", "kg", 28_000),
        ],
    ),
    (
        "LAC",
        "Lacteos",
        &[
            ("Queso Fresco", "kg", 12_000),
            ("Crema 1L", "pz", 5_800),
            ("Mantequilla 90g", "pz", 2_600),
        ],
    ),
    (
        "DES",
        "Desechables",
        &[
            ("Vaso Termico 12oz", "pz", 9_500),
            ("Plato Pastelero", "pz", 4_200),
            ("Bolsa Camiseta", "kg", 6_000),
        ],
    ),
];

/// (name, credit limit cents, default price level)
const CLIENTS: &[(&str, i64, i64)] = &[
    ("Abarrotes Lupita", 500_000, 2),
    ("Cremeria Ortiz", 250_000, 3),
    ("Fonda Dona Mary", 100_000, 2),
    ("Mayoreo El Sol", 2_000_000, 5),
];

/// (name, weight in grams)
const TARES: &[(&str, i64)] = &[
    ("Caja de plastico", 1_800),
    ("Costal", 250),
    ("Caja de carton", 600),
    ("Cubeta", 900),
];

/// Each tier is this many basis points cheaper than the previous one.
const TIER_STEP_BPS: i64 = 400;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./caja_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Caja POS Seed Data Generator");
                println!();
                println!("Usage: caja-seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./caja_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Caja POS Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let mut generated = 0;
    for (prefix, line, items) in CATALOGUE {
        for (idx, (name, unit, price1)) in items.iter().enumerate() {
            let product = generate_product(prefix, line, name, unit, *price1, idx)?;

            if let Err(e) = db.products().insert(&product).await {
                eprintln!("Failed to insert {}: {}", product.code, e);
                continue;
            }
            generated += 1;
        }
    }
    println!("✓ Generated {} products", generated);

    println!("Generating clients...");
    for (name, limit, level) in CLIENTS {
        validate_name("name", name)?;
        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            credit_limit: Money::from_cents(*limit),
            balance: Money::zero(),
            default_price_level: PriceLevel::new(*level)?,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.clients().insert(&client).await?;
    }
    println!("✓ Generated {} clients", CLIENTS.len());

    println!("Generating tare options...");
    for (name, grams) in TARES {
        let tare = TareOption {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            weight: Quantity::from_millis(*grams),
        };
        db.tares().insert(&tare).await?;
    }
    println!("✓ Generated {} tare options", TARES.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds one catalogue product with descending tiers and some stock.
fn generate_product(
    prefix: &str,
    line: &str,
    name: &str,
    unit: &str,
    price1_cents: i64,
    seed: usize,
) -> Result<Product, Box<dyn std::error::Error>> {
    let now = Utc::now();

    let code = format!("{}-{:03}", prefix, seed + 1);
    validate_product_code(&code)?;
    validate_name("name", name)?;

    let mut prices = [Money::zero(); 5];
    let mut cents = price1_cents;
    for price in prices.iter_mut() {
        *price = Money::from_cents(cents);
        cents -= cents * TIER_STEP_BPS / 10_000;
    }

    // Cost sits 30% under price1
    let cost = Money::from_cents(price1_cents * 70 / 100);

    // 20 to 120 units (kg or pieces)
    let stock = Quantity::from_units(20 + ((seed as i64 * 37) % 101));

    Ok(Product {
        id: generate_product_id(),
        code,
        name: name.to_string(),
        line: Some(line.to_string()),
        subline: None,
        unit: unit.to_string(),
        stock,
        cost,
        prices,
        is_active: true,
        created_at: now,
        updated_at: now,
    })
}
