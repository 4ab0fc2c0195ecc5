//! Command dispatcher
//!
//! Each invocation loads the store, runs one command, prints its result, and
//! saves the store again when the command changed anything.

use super::args::{CliArgs, Command};
use crate::config::MarketConfig;
use crate::core::{Marketplace, SharedClock};
use crate::io::snapshot;
use crate::types::{Item, MarketError, Order};
use rust_decimal::Decimal;
use std::io::Write;
use tracing::info;

/// Load the store, run `args.command`, and persist any change
///
/// # Arguments
///
/// * `args` - Parsed command line
/// * `clock` - Source of "today" for the session
/// * `out` - Writer for command output
///
/// # Errors
///
/// Returns the first error raised by loading, the command, printing, or saving.
/// Nothing is saved when the command fails.
pub fn run(args: &CliArgs, clock: SharedClock, out: &mut dyn Write) -> Result<(), MarketError> {
    let config = args.to_config();
    let mut market = open_store(&config, clock)?;

    execute(&mut market, &args.command, &config, out)?;

    if args.command.mutates() {
        snapshot::save(&market, &config.data_dir)?;
    }
    Ok(())
}

/// Load the snapshot in `config.data_dir`, or start empty if there is none
pub fn open_store(config: &MarketConfig, clock: SharedClock) -> Result<Marketplace, MarketError> {
    if snapshot::exists(&config.data_dir) {
        snapshot::load_with_prefix(&config.data_dir, clock, &config.order_prefix)
    } else {
        info!(dir = %config.data_dir.display(), "no snapshot found, starting empty");
        Ok(Marketplace::with_order_prefix(clock, &config.order_prefix))
    }
}

/// Run one command against an already loaded store
pub fn execute(
    market: &mut Marketplace,
    command: &Command,
    config: &MarketConfig,
    out: &mut dyn Write,
) -> Result<(), MarketError> {
    let today = market.today();

    match command {
        Command::RegisterBuyer {
            id,
            username,
            credential,
        } => {
            market.register_buyer(id, username, credential)?;
            writeln!(out, "Registered buyer {}", id)?;
        }
        Command::RegisterSeller {
            id,
            username,
            credential,
        } => {
            market.register_seller(id, username, credential)?;
            writeln!(out, "Registered seller {}", id)?;
        }
        Command::Login {
            username,
            credential,
        } => {
            let principal = market.login(username, credential)?;
            writeln!(out, "Logged in as {} {}", principal.role(), principal.id())?;
        }
        Command::Items => print_items(out, market.items())?,
        Command::MyItems { seller } => print_items(out, market.items_for_seller(seller)?)?,
        Command::Purchase {
            buyer,
            item,
            quantity,
        } => {
            let order = market.purchase(buyer, item, *quantity, today)?;
            writeln!(out, "Purchase OK. Order {}", order)?;
        }
        Command::Orders { buyer } => print_orders(out, market.orders_for_buyer(buyer)?)?,
        Command::Spending { buyer, days } => {
            let days = days.unwrap_or(config.window_days);
            let total = market.buyer_spending_within_last_days(buyer, days)?;
            writeln!(out, "Spending of {} in the last {} days: {}", buyer, days, total)?;
        }
        Command::TopUp { account, amount } => {
            check_amount(*amount)?;
            market.ledger_mut().deposit(account, *amount, today, "topup")?;
            print_balance(out, market, account)?;
        }
        Command::Withdraw { account, amount } => {
            check_amount(*amount)?;
            market
                .ledger_mut()
                .withdraw(account, *amount, today, "withdraw")?;
            print_balance(out, market, account)?;
        }
        Command::AddItem {
            seller,
            item,
            name,
            price,
            stock,
        } => {
            market.add_item(seller, item, name, *price, *stock)?;
            writeln!(out, "Listed item {}", item)?;
        }
        Command::Replenish {
            seller,
            item,
            quantity,
        } => {
            market.replenish_item(seller, item, *quantity)?;
            print_stock(out, market, item)?;
        }
        Command::Discard {
            seller,
            item,
            quantity,
        } => {
            market.discard_item(seller, item, *quantity)?;
            print_stock(out, market, item)?;
        }
        Command::SetPrice {
            seller,
            item,
            price,
        } => {
            market.set_item_price(seller, item, *price)?;
            writeln!(out, "Price of {} is now {}", item, price)?;
        }
        Command::CompleteOrder { seller, order } => {
            market.complete_order(seller, order)?;
            writeln!(out, "Order {} completed", order)?;
        }
        Command::Customers => print_lines(out, market.ledger().list_customers())?,
        Command::RecentEntries => {
            let rows = market.ledger().entries_within_last_days(config.window_days);
            print_lines(
                out,
                rows.into_iter()
                    .map(|(label, amount)| format!("{} | {}", label, amount)),
            )?;
        }
        Command::Dormant => print_lines(
            out,
            market
                .ledger()
                .accounts_without_recent_activity(config.dormancy_days),
        )?,
        Command::ActiveAccounts => {
            print_ranking(out, market.ledger().top_active_accounts_today(config.top))?
        }
        Command::RecentOrders => {
            print_orders(out, market.list_orders_within_last_days(config.window_days))?
        }
        Command::PaidOrders => print_orders(out, market.list_paid_orders())?,
        Command::MostSold => print_ranking(out, market.most_sold_items(config.top))?,
        Command::ActiveBuyers => print_ranking(out, market.most_active_buyers_today(config.top))?,
        Command::ActiveSellers => {
            print_ranking(out, market.most_active_sellers_today(config.top))?
        }
        Command::SeedDemo => {
            market.seed_demo()?;
            writeln!(out, "Demo data created")?;
        }
    }

    Ok(())
}

/// Top-ups and withdrawals from the command line must be positive amounts
fn check_amount(amount: Decimal) -> Result<(), MarketError> {
    if amount <= Decimal::ZERO {
        return Err(MarketError::invalid_input(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}

fn print_balance(out: &mut dyn Write, market: &Marketplace, account: &str) -> Result<(), MarketError> {
    writeln!(out, "Balance of {}: {}", account, market.ledger().balance(account)?)?;
    Ok(())
}

fn print_stock(out: &mut dyn Write, market: &Marketplace, item: &str) -> Result<(), MarketError> {
    let item = market
        .catalog()
        .get(item)
        .ok_or_else(|| MarketError::item_not_found(item))?;
    writeln!(out, "Stock of {}: {}", item.id, item.stock)?;
    Ok(())
}

fn print_lines<S: AsRef<str>>(
    out: &mut dyn Write,
    lines: impl IntoIterator<Item = S>,
) -> Result<(), MarketError> {
    let mut empty = true;
    for line in lines {
        writeln!(out, "{}", line.as_ref())?;
        empty = false;
    }
    if empty {
        writeln!(out, "(none)")?;
    }
    Ok(())
}

fn print_items<'a>(
    out: &mut dyn Write,
    items: impl IntoIterator<Item = &'a Item>,
) -> Result<(), MarketError> {
    print_lines(
        out,
        items.into_iter().map(|item| {
            format!(
                "{} | {} | price {} | stock {} | sold {}",
                item.id, item.name, item.price, item.stock, item.sold
            )
        }),
    )
}

fn print_orders<'a>(
    out: &mut dyn Write,
    orders: impl IntoIterator<Item = &'a Order>,
) -> Result<(), MarketError> {
    print_lines(
        out,
        orders.into_iter().map(|order| {
            format!(
                "{} | {} | {} -> {} | {} x{} | {} | {}",
                order.id,
                order.date,
                order.buyer,
                order.seller,
                order.item_name,
                order.quantity,
                order.total,
                order.status
            )
        }),
    )
}

fn print_ranking<K: std::fmt::Display, C: std::fmt::Display>(
    out: &mut dyn Write,
    ranking: Vec<(K, C)>,
) -> Result<(), MarketError> {
    print_lines(
        out,
        ranking
            .into_iter()
            .map(|(key, count)| format!("{}: {}", key, count)),
    )
}
