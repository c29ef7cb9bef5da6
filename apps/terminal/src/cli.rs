//! # Command Line
//!
//! `caja <command> [args]`. Amounts are decimal (`150`, `150.50`),
//! quantities and weights take up to three decimals (`2.5`, `0.125`).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use caja_core::{Money, PaymentBreakdown, Quantity};

#[derive(Debug, Parser)]
#[command(name = "caja", version, about = "Caja POS cashier terminal")]
pub struct Cli {
    /// Database file (overrides CAJA_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start a new draft order
    NewOrder {
        /// Client the order is for
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Show an order with its totals
    ShowOrder { order: String },

    /// List drafts and credit orders awaiting collection
    ListOpen,

    /// Add a product by code
    AddItem {
        order: String,
        code: String,
        #[arg(long, default_value = "1")]
        quantity: Quantity,
        #[command(flatten)]
        price: PriceArgs,
    },

    /// Add a product weighed on the scale
    AddWeighed {
        order: String,
        code: String,
        /// Gross weight read from the scale
        #[arg(long)]
        gross: Quantity,
        /// Tare option id of the container
        #[arg(long)]
        tare: Option<String>,
        /// Number of containers on the scale
        #[arg(long, default_value_t = 1)]
        boxes: u32,
        #[command(flatten)]
        price: PriceArgs,
    },

    /// Remove a line
    RemoveItem { order: String, line: String },

    /// Set a line's quantity
    UpdateQuantity {
        order: String,
        line: String,
        quantity: Quantity,
    },

    /// Re-price a line
    UpdatePrice {
        order: String,
        line: String,
        #[command(flatten)]
        price: PriceArgs,
    },

    /// Set the order discount (0 removes it)
    ApplyDiscount { order: String, amount: Money },

    /// Attach a client, or detach it when omitted
    SetClient {
        order: String,
        client: Option<String>,
    },

    /// Cancel a draft or an uncollected credit order
    Cancel { order: String },

    /// Settle a draft order
    Settle {
        order: String,
        #[command(flatten)]
        tender: TenderArgs,
        /// Administrative password, to charge credit above the limit
        #[arg(long)]
        authorize: Option<String>,
    },

    /// Take an installment on a pending or partially paid order
    Pay {
        order: String,
        amount: Money,
        #[command(flatten)]
        tender: TenderArgs,
    },

    /// Payment history of an order
    Payments { order: String },

    /// Check a credit charge against a client's limit
    CheckCredit {
        #[arg(long, conflicts_with = "order")]
        client: Option<String>,
        #[arg(long, requires = "client")]
        amount: Option<Money>,
        /// Check the full total of this order instead
        #[arg(long)]
        order: Option<String>,
    },

    /// List active products
    Products,

    /// Look up a product by code
    Product { code: String },

    /// List active clients
    Clients,

    /// List tare options
    Tares,

    /// Add received goods to stock
    ReceiveStock { code: String, quantity: Quantity },

    /// Show the terminal configuration
    Config,
}

#[derive(Debug, Clone, Args)]
pub struct PriceArgs {
    /// Price tier 1-5
    #[arg(long)]
    pub level: Option<i64>,

    /// Manual unit price
    #[arg(long)]
    pub price: Option<Money>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodKind {
    Cash,
    Card,
    Transfer,
    Credit,
    Mixed,
}

impl MethodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodKind::Cash => "cash",
            MethodKind::Card => "card",
            MethodKind::Transfer => "transfer",
            MethodKind::Credit => "credit",
            MethodKind::Mixed => "mixed",
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct TenderArgs {
    #[arg(value_enum)]
    pub method: MethodKind,

    /// Cash handed over by the customer
    #[arg(long)]
    pub received: Option<Money>,

    /// Card voucher or transfer folio
    #[arg(long)]
    pub reference: Option<String>,

    /// Mixed: cash portion
    #[arg(long)]
    pub cash: Option<Money>,

    /// Mixed: card portion
    #[arg(long)]
    pub card: Option<Money>,

    /// Mixed: transfer portion
    #[arg(long)]
    pub transfer: Option<Money>,

    /// Mixed: credit portion
    #[arg(long)]
    pub credit: Option<Money>,

    /// Mixed: card voucher
    #[arg(long)]
    pub card_ref: Option<String>,

    /// Mixed: transfer folio
    #[arg(long)]
    pub transfer_ref: Option<String>,
}

impl TenderArgs {
    pub fn breakdown(&self) -> PaymentBreakdown {
        PaymentBreakdown {
            cash: self.cash.unwrap_or_default(),
            card: self.card.unwrap_or_default(),
            transfer: self.transfer.unwrap_or_default(),
            credit: self.credit.unwrap_or_default(),
            card_reference: self.card_ref.clone(),
            transfer_reference: self.transfer_ref.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_settle_mixed() {
        let cli = Cli::try_parse_from([
            "caja", "settle", "o1", "mixed", "--cash", "100", "--credit", "50.25", "--card",
            "20", "--card-ref", "VOUCHER-9",
        ])
        .unwrap();

        match cli.command {
            Command::Settle { order, tender, authorize } => {
                assert_eq!(order, "o1");
                assert_eq!(tender.method, MethodKind::Mixed);
                let breakdown = tender.breakdown();
                assert_eq!(breakdown.total(), Money::from_cents(17_025));
                assert_eq!(breakdown.card_reference.as_deref(), Some("VOUCHER-9"));
                assert!(breakdown.transfer_reference.is_none());
                assert!(authorize.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_weighed_quantities() {
        let cli = Cli::try_parse_from([
            "caja", "add-weighed", "o1", "NUEZ-01", "--gross", "50", "--tare", "t1", "--boxes",
            "3",
        ])
        .unwrap();

        match cli.command {
            Command::AddWeighed { gross, boxes, .. } => {
                assert_eq!(gross, Quantity::from_units(50));
                assert_eq!(boxes, 3);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_bad_amount_is_rejected() {
        assert!(Cli::try_parse_from(["caja", "apply-discount", "o1", "12.345"]).is_err());
    }
}
