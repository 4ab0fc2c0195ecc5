use crate::config::{MarketConfig, DEFAULT_DATA_DIR};
use crate::core::ids::DEFAULT_ORDER_PREFIX;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

/// Run one marketplace command against a snapshot directory
#[derive(Parser, Debug)]
#[command(name = "marketplace-ledger")]
#[command(about = "Marketplace with a bank-style ledger and flat-file snapshots", long_about = None)]
pub struct CliArgs {
    /// Snapshot directory
    #[arg(
        long = "data-dir",
        value_name = "DIR",
        env = "MARKET_DATA_DIR",
        default_value = DEFAULT_DATA_DIR,
        global = true,
        help = "Directory holding the snapshot files"
    )]
    pub data_dir: PathBuf,

    /// Dormancy threshold for the `dormant` report
    #[arg(
        long = "dormancy-days",
        value_name = "DAYS",
        default_value_t = 30,
        global = true,
        help = "Days without activity before an account counts as dormant"
    )]
    pub dormancy_days: u32,

    /// Look-back window for the recent reports
    #[arg(
        long = "window-days",
        value_name = "DAYS",
        default_value_t = 7,
        global = true,
        help = "Look-back window for recent-entries, recent-orders, and spending"
    )]
    pub window_days: u32,

    /// Row limit for ranking reports
    #[arg(
        long = "top",
        value_name = "N",
        default_value_t = 5,
        global = true,
        help = "Number of rows kept by the ranking reports"
    )]
    pub top: usize,

    /// Prefix of generated order ids
    #[arg(
        long = "order-prefix",
        value_name = "PREFIX",
        default_value = DEFAULT_ORDER_PREFIX,
        global = true,
        help = "Prefix of new order ids (e.g. TX gives TX000001)"
    )]
    pub order_prefix: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Marketplace commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Register a buyer and open their ledger account
    RegisterBuyer {
        id: String,
        username: String,
        credential: String,
    },
    /// Register a seller and open their ledger account
    RegisterSeller {
        id: String,
        username: String,
        credential: String,
    },
    /// Check a username and credential
    Login { username: String, credential: String },
    /// List every item in the catalog
    Items,
    /// List the items a seller has listed
    MyItems { seller: String },
    /// Buy a quantity of an item
    Purchase {
        buyer: String,
        item: String,
        quantity: u32,
    },
    /// List a buyer's orders
    Orders { buyer: String },
    /// Total a buyer spent within the window
    Spending {
        buyer: String,
        /// Overrides --window-days for this report
        #[arg(long)]
        days: Option<u32>,
    },
    /// Deposit funds into an account
    TopUp { account: String, amount: Decimal },
    /// Withdraw funds from an account
    Withdraw { account: String, amount: Decimal },
    /// List a new item
    AddItem {
        seller: String,
        item: String,
        name: String,
        price: Decimal,
        stock: u32,
    },
    /// Add stock to an item
    Replenish {
        seller: String,
        item: String,
        quantity: u32,
    },
    /// Remove stock from an item (floors at zero)
    Discard {
        seller: String,
        item: String,
        quantity: u32,
    },
    /// Change an item's price
    SetPrice {
        seller: String,
        item: String,
        price: Decimal,
    },
    /// Mark a paid order as completed
    CompleteOrder { seller: String, order: String },
    /// List every ledger account
    Customers,
    /// Ledger entries within the window
    RecentEntries,
    /// Accounts without recent activity
    Dormant,
    /// Accounts with the most entries today
    ActiveAccounts,
    /// Orders within the window
    RecentOrders,
    /// Orders still awaiting completion
    PaidOrders,
    /// Best-selling items
    MostSold,
    /// Buyers with the most orders today
    ActiveBuyers,
    /// Sellers with the most orders today
    ActiveSellers,
    /// Create the demo seller, buyer, and items
    SeedDemo,
}

impl Command {
    /// Whether the command changes state and needs a save afterwards
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Command::RegisterBuyer { .. }
                | Command::RegisterSeller { .. }
                | Command::Purchase { .. }
                | Command::TopUp { .. }
                | Command::Withdraw { .. }
                | Command::AddItem { .. }
                | Command::Replenish { .. }
                | Command::Discard { .. }
                | Command::SetPrice { .. }
                | Command::CompleteOrder { .. }
                | Command::SeedDemo
        )
    }
}

impl CliArgs {
    /// Create a MarketConfig from CLI arguments
    pub fn to_config(&self) -> MarketConfig {
        MarketConfig::new(
            self.data_dir.clone(),
            self.dormancy_days,
            self.window_days,
            self.top,
            &self.order_prefix,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::register(
        &["program", "register-buyer", "B1", "bob", "pw"],
        Command::RegisterBuyer { id: "B1".to_string(), username: "bob".to_string(), credential: "pw".to_string() }
    )]
    #[case::purchase(
        &["program", "purchase", "B1", "I1", "3"],
        Command::Purchase { buyer: "B1".to_string(), item: "I1".to_string(), quantity: 3 }
    )]
    #[case::top_up(
        &["program", "top-up", "B1", "12.50"],
        Command::TopUp { account: "B1".to_string(), amount: Decimal::new(1250, 2) }
    )]
    #[case::spending_override(
        &["program", "spending", "B1", "--days", "30"],
        Command::Spending { buyer: "B1".to_string(), days: Some(30) }
    )]
    #[case::report(&["program", "most-sold"], Command::MostSold)]
    fn test_command_parsing(#[case] args: &[&str], #[case] expected: Command) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.command, expected);
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "dormant",
            "--data-dir",
            "/tmp/store",
            "--dormancy-days",
            "10",
            "--top",
            "3",
        ])
        .unwrap();

        let config = parsed.to_config();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/store"));
        assert_eq!(config.dormancy_days, 10);
        assert_eq!(config.window_days, 7);
        assert_eq!(config.top, 3);
        assert_eq!(config.order_prefix, "TX");
    }

    #[test]
    fn test_order_prefix_option() {
        let parsed =
            CliArgs::try_parse_from(["program", "purchase", "B1", "I1", "1", "--order-prefix", "ORD"])
                .unwrap();

        assert_eq!(parsed.to_config().order_prefix, "ORD");
    }

    #[rstest]
    #[case::seed(Command::SeedDemo, true)]
    #[case::withdraw(Command::Withdraw { account: "B1".to_string(), amount: Decimal::ONE }, true)]
    #[case::items(Command::Items, false)]
    #[case::login(Command::Login { username: "u".to_string(), credential: "c".to_string() }, false)]
    fn test_mutating_commands(#[case] command: Command, #[case] expected: bool) {
        assert_eq!(command.mutates(), expected);
    }

    // Error handling tests
    #[rstest]
    #[case::missing_command(&["program"])]
    #[case::unknown_command(&["program", "refund", "TX000001"])]
    #[case::bad_quantity(&["program", "purchase", "B1", "I1", "three"])]
    #[case::negative_quantity(&["program", "replenish", "S1", "I1", "-2"])]
    #[case::bad_amount(&["program", "top-up", "B1", "lots"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        let result = CliArgs::try_parse_from(args);
        assert!(result.is_err());
    }
}
