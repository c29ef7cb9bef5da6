//! # Caja Terminal Library
//!
//! The cashier terminal: parses one command, runs it against the local
//! database and prints the result as JSON.
//!
//! ## Module Organization
//! ```text
//! caja_terminal/
//! ├── lib.rs          ◄─── You are here (startup & dispatch)
//! ├── cli.rs          ◄─── clap command definitions
//! ├── state/
//! │   ├── config.rs   ◄─── ConfigState (CAJA_* environment)
//! │   ├── db.rs       ◄─── DbState (Arc<dyn DataAccess>)
//! │   ├── session.rs  ◄─── SessionContext (credit overrides)
//! │   └── notifier.rs ◄─── Notifier (change events)
//! ├── commands/
//! │   ├── order.rs    ◄─── Draft editing
//! │   ├── settlement.rs ◄─ settle, installments
//! │   ├── credit.rs   ◄─── Credit checks
//! │   └── catalog.rs  ◄─── Products, clients, tares, stock
//! └── error.rs        ◄─── ApiError for commands
//! ```

pub mod cli;
pub mod commands;
pub mod error;
pub mod state;

#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use directories::ProjectDirs;
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use caja_db::{Database, DbConfig};
use cli::{Cli, Command};
use commands::order::{AddItemRequest, WeighRequest};
use error::ApiError;
use state::{ConfigState, DbState, Notifier, SessionContext};

/// Runs the terminal.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Terminal Startup                                  │
/// │                                                                         │
/// │  1. Parse Command Line ───────────────────────────────────────────────► │
/// │                                                                         │
/// │  2. Initialize Logging ───────────────────────────────────────────────► │
/// │     • tracing-subscriber with env filter, written to stderr             │
/// │     • Default: info,caja=debug,sqlx=warn; override with RUST_LOG        │
/// │                                                                         │
/// │  3. Load Configuration ───────────────────────────────────────────────► │
/// │     • CAJA_* environment variables over defaults                        │
/// │                                                                         │
/// │  4. Connect to Database ──────────────────────────────────────────────► │
/// │     • --db, then CAJA_DB_PATH, then the platform data directory         │
/// │     • SQLite with WAL mode, pending migrations applied                  │
/// │                                                                         │
/// │  5. Build State & Dispatch ───────────────────────────────────────────► │
/// │     • stdout: JSON result, exit 0                                       │
/// │     • stderr: {"code", "message"}, exit 1                               │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing();

    let config = ConfigState::from_env();

    let db_path = match cli.db.clone().or_else(|| config.database_path.clone()) {
        Some(path) => path,
        None => default_database_path()?,
    };
    info!(?db_path, "Database path determined");

    let db = Database::new(DbConfig::new(db_path.clone()))
        .await
        .with_context(|| format!("opening database {}", db_path.display()))?;

    let db = DbState::from_database(db);
    let session = SessionContext::from_config(&config);
    let notifier = Notifier::new(config.notifier_capacity);

    match dispatch(cli.command, &db, &config, &session, &notifier).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{}", serde_json::to_string(&err)?);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Runs one command against injected state.
pub async fn dispatch(
    command: Command,
    db: &DbState,
    config: &ConfigState,
    session: &SessionContext,
    notifier: &Notifier,
) -> Result<serde_json::Value, ApiError> {
    use commands::{catalog, credit, order, settlement};

    match command {
        Command::NewOrder { client, notes } => {
            to_json(order::new_order(db, notifier, client.as_deref(), notes).await?)
        }
        Command::ShowOrder { order: id } => to_json(order::show_order(db, &id).await?),
        Command::ListOpen => to_json(order::list_open(db).await?),
        Command::AddItem {
            order: id,
            code,
            quantity,
            price,
        } => {
            let request = AddItemRequest {
                product_code: code,
                quantity,
                price_level: price.level,
                unit_price: price.price,
            };
            to_json(order::add_item(db, notifier, &id, request).await?)
        }
        Command::AddWeighed {
            order: id,
            code,
            gross,
            tare,
            boxes,
            price,
        } => {
            let request = WeighRequest {
                product_code: code,
                gross_weight: gross,
                tare_id: tare,
                box_count: boxes,
                price_level: price.level,
                unit_price: price.price,
            };
            to_json(order::add_weighed(db, notifier, &id, request).await?)
        }
        Command::RemoveItem { order: id, line } => {
            to_json(order::remove_item(db, notifier, &id, &line).await?)
        }
        Command::UpdateQuantity {
            order: id,
            line,
            quantity,
        } => to_json(order::update_quantity(db, notifier, &id, &line, quantity).await?),
        Command::UpdatePrice {
            order: id,
            line,
            price,
        } => to_json(
            order::update_price(db, notifier, &id, &line, price.level, price.price).await?,
        ),
        Command::ApplyDiscount { order: id, amount } => {
            to_json(order::apply_discount(db, notifier, &id, amount).await?)
        }
        Command::SetClient { order: id, client } => {
            to_json(order::set_client(db, notifier, &id, client.as_deref()).await?)
        }
        Command::Cancel { order: id } => to_json(order::cancel_order(db, notifier, &id).await?),
        Command::Settle {
            order: id,
            tender,
            authorize,
        } => {
            let method = settlement::payment_method(
                tender.method.as_str(),
                tender.received,
                tender.reference.clone(),
                tender.breakdown(),
            )?;
            let resp = settlement::settle_order(
                db,
                session,
                notifier,
                &id,
                method,
                authorize.as_deref(),
            )
            .await?;
            info!(
                store = %config.store_name,
                total = %config.format_currency(resp.total_cents),
                change = %config.format_currency(resp.change_cents),
                "Sale complete"
            );
            to_json(resp)
        }
        Command::Pay {
            order: id,
            amount,
            tender,
        } => {
            // Exact cash unless told otherwise
            let method = settlement::payment_method(
                tender.method.as_str(),
                tender.received.or(Some(amount)),
                tender.reference.clone(),
                tender.breakdown(),
            )?;
            to_json(settlement::pay_installment(db, notifier, &id, amount, method).await?)
        }
        Command::Payments { order: id } => to_json(settlement::list_payments(db, &id).await?),
        Command::CheckCredit {
            client,
            amount,
            order: id,
        } => match (id, amount) {
            (Some(id), _) => to_json(credit::check_order_credit(db, &id).await?),
            (None, Some(amount)) => {
                to_json(credit::check_client_credit(db, client.as_deref(), amount).await?)
            }
            (None, None) => Err(ApiError::validation(
                "check-credit needs --order, or --client with --amount",
            )),
        },
        Command::Products => to_json(catalog::list_products(db).await?),
        Command::Product { code } => to_json(catalog::find_product(db, &code).await?),
        Command::Clients => to_json(catalog::list_clients(db).await?),
        Command::Tares => to_json(catalog::list_tares(db).await?),
        Command::ReceiveStock { code, quantity } => {
            to_json(catalog::receive_stock(db, notifier, &code, quantity).await?)
        }
        Command::Config => to_json(config),
    }
}

fn to_json<T: Serialize>(value: T) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::internal(e.to_string()))
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so stdout stays pure JSON.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=caja=trace` - Show trace for caja crates only
/// - Default: info, debug for caja crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,caja=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .with_writer(std::io::stderr)
        .init();
}

/// Determines the database file path based on the platform.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.caja.pos/caja.db`
/// - **Windows**: `%APPDATA%\caja\pos\caja.db`
/// - **Linux**: `~/.local/share/pos/caja.db`
fn default_database_path() -> anyhow::Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "caja", "pos")
        .context("could not determine app data directory")?;

    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.join("caja.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;

    async fn run_cli(fx: &Fixture, args: &[&str]) -> Result<serde_json::Value, ApiError> {
        let mut argv = vec!["caja"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        dispatch(
            cli.command,
            &fx.db,
            &ConfigState::default(),
            &fx.session,
            &fx.notifier,
        )
        .await
    }

    #[tokio::test]
    async fn test_cash_sale_through_dispatch() {
        let fx = Fixture::new().await;
        fx.product("AZUC-01", 20, 5_000).await;

        let created = run_cli(&fx, &["new-order"]).await.unwrap();
        let id = created["order"]["id"].as_str().unwrap().to_string();

        run_cli(&fx, &["add-item", &id, "AZUC-01", "--quantity", "3"])
            .await
            .unwrap();
        let settled = run_cli(&fx, &["settle", &id, "cash", "--received", "200"])
            .await
            .unwrap();

        assert_eq!(settled["status"], "paid");
        assert_eq!(settled["totalCents"], 15_000);
        assert_eq!(settled["changeCents"], 5_000);
    }

    #[tokio::test]
    async fn test_check_credit_needs_a_target() {
        let fx = Fixture::new().await;
        let err = run_cli(&fx, &["check-credit"]).await.unwrap_err();
        assert_eq!(err.code, error::ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_config_hides_password_hash() {
        let fx = Fixture::new().await;
        let value = run_cli(&fx, &["config"]).await.unwrap();
        assert_eq!(value["storeName"], "Caja POS");
        assert!(value.get("adminPasswordHash").is_none());
    }
}
