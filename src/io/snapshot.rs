//! Snapshot persistence for the marketplace
//!
//! A snapshot is a directory holding five flat files:
//!
//! | File               | Header record                                   | Detail record                |
//! |--------------------|-------------------------------------------------|------------------------------|
//! | `accounts.txt`     | `accountID\|owner\|balance`                     | `accountID,date,amount,note` |
//! | `items.txt`        | `itemID\|name\|price\|stock\|sold`              | (none)                       |
//! | `buyers.txt`       | `userID\|username\|credential`                  | `userID,orderID`             |
//! | `sellers.txt`      | `userID\|username\|credential`                  | `userID,item,itemID` / `userID,sale,orderID` |
//! | `transactions.txt` | `id\|date\|buyer\|seller\|item\|name\|qty\|total\|status` | (none)             |
//!
//! Records are written in identifier order and detail records follow their
//! header in append order, so saving the same state always produces the same
//! bytes.
//!
//! # Error Handling
//!
//! - A missing directory or file fails with `FileNotFound`
//! - A malformed record fails with `ParseError` naming the file and line
//! - Records that parse but do not line up fail with `DataIntegrity`
//!
//! Loading always builds a new [`Marketplace`], so a failed load leaves the
//! caller's state untouched.

use crate::core::clock::{parse_date, SharedClock, DATE_FORMAT};
use crate::core::ids::DEFAULT_ORDER_PREFIX;
use crate::core::Marketplace;
use crate::io::flat_format::{
    classify, read_record, split_records, write_record, AccountRecord, BuyerOrderRecord,
    EntryRecord, ItemRecord, OrderRecord, PrincipalRecord, RecordKind, SellerLinkRecord,
    SELLER_ITEM_TAG, SELLER_SALE_TAG,
};
use crate::types::{
    Account, Buyer, Item, LedgerEntry, MarketError, Order, OrderStatus, Seller,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const ACCOUNTS_FILE: &str = "accounts.txt";
pub const ITEMS_FILE: &str = "items.txt";
pub const BUYERS_FILE: &str = "buyers.txt";
pub const SELLERS_FILE: &str = "sellers.txt";
pub const TRANSACTIONS_FILE: &str = "transactions.txt";

/// Whether `dir` holds a snapshot
pub fn exists(dir: &Path) -> bool {
    dir.join(ACCOUNTS_FILE).is_file()
}

/// Write the full marketplace state into `dir`
///
/// All five files are rendered in memory, then written and synced to
/// temporary files in `dir` before any of them replaces its target. If a
/// replacement fails, the files already replaced get their previous contents
/// back, so a failed save leaves the old snapshot in place.
///
/// # Arguments
///
/// * `market` - State to persist
/// * `dir` - Snapshot directory, created if missing
///
/// # Errors
///
/// Returns `MarketError::IoError` if the directory or any file cannot be written.
pub fn save(market: &Marketplace, dir: &Path) -> Result<(), MarketError> {
    let files = [
        (ACCOUNTS_FILE, render_accounts(market)?),
        (ITEMS_FILE, render_items(market)?),
        (BUYERS_FILE, render_buyers(market)?),
        (SELLERS_FILE, render_sellers(market)?),
        (TRANSACTIONS_FILE, render_orders(market)?),
    ];

    fs::create_dir_all(dir)?;

    let staged = files
        .iter()
        .map(|(name, contents)| stage(dir, *name, contents.as_bytes()))
        .collect::<Result<Vec<_>, _>>()?;
    commit(dir, staged)?;

    info!(
        dir = %dir.display(),
        accounts = market.ledger().len(),
        items = market.catalog().len(),
        orders = market.orders().count(),
        "snapshot saved"
    );
    Ok(())
}

/// A rendered file waiting next to its target, with the bytes it replaces
struct StagedFile {
    name: &'static str,
    temp: NamedTempFile,
    previous: Option<Vec<u8>>,
}

fn stage(dir: &Path, name: &'static str, contents: &[u8]) -> Result<StagedFile, MarketError> {
    let target = dir.join(name);
    let previous = match fs::metadata(&target) {
        Ok(meta) if meta.is_file() => Some(fs::read(&target)?),
        Ok(_) => {
            return Err(MarketError::IoError {
                message: format!("{} is not a regular file", target.display()),
            })
        }
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    Ok(StagedFile {
        name,
        temp: write_temp(dir, contents)?,
        previous,
    })
}

fn write_temp(dir: &Path, contents: &[u8]) -> Result<NamedTempFile, MarketError> {
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    Ok(temp)
}

/// Move every staged file over its target, undoing earlier moves on failure
///
/// Staged files that were never moved are deleted when dropped.
fn commit(dir: &Path, staged: Vec<StagedFile>) -> Result<(), MarketError> {
    let mut replaced: Vec<(&'static str, Option<Vec<u8>>)> = Vec::new();

    for file in staged {
        if let Err(e) = file.temp.persist(dir.join(file.name)) {
            rollback(dir, &replaced);
            return Err(MarketError::IoError {
                message: format!("Failed to replace {}: {}", file.name, e.error),
            });
        }
        debug!(file = file.name, "snapshot file written");
        replaced.push((file.name, file.previous));
    }
    Ok(())
}

fn rollback(dir: &Path, replaced: &[(&'static str, Option<Vec<u8>>)]) {
    for (name, previous) in replaced {
        let target = dir.join(name);
        let restored = match previous {
            Some(bytes) => write_temp(dir, bytes).and_then(|temp| {
                temp.persist(&target).map(|_| ()).map_err(|e| MarketError::IoError {
                    message: e.error.to_string(),
                })
            }),
            None => fs::remove_file(&target).map_err(MarketError::from),
        };

        match restored {
            Ok(()) => debug!(file = name, "snapshot file rolled back"),
            Err(e) => warn!(file = name, error = %e, "failed to roll back snapshot file"),
        }
    }
}

/// Read a snapshot from `dir` into a new marketplace
///
/// Ledger accounts missing for a buyer or seller are recreated with a zero
/// balance. The order-id sequence resumes after the highest stored id.
///
/// # Arguments
///
/// * `dir` - Snapshot directory
/// * `clock` - Clock for the restored marketplace
///
/// # Errors
///
/// - `FileNotFound` if the directory or one of the five files is missing
/// - `ParseError` for a malformed record
/// - `DataIntegrity` for inconsistent records (balance not matching its
///   entries, item with two owners, dangling item or order reference)
pub fn load(dir: &Path, clock: SharedClock) -> Result<Marketplace, MarketError> {
    load_with_prefix(dir, clock, DEFAULT_ORDER_PREFIX)
}

/// Like [`load`], generating new order ids with `prefix`
pub fn load_with_prefix(
    dir: &Path,
    clock: SharedClock,
    prefix: &str,
) -> Result<Marketplace, MarketError> {
    if !dir.is_dir() {
        return Err(MarketError::FileNotFound {
            path: dir.display().to_string(),
        });
    }

    let mut market = Marketplace::with_order_prefix(clock, prefix);

    for account in parse_accounts(&read_file(dir, ACCOUNTS_FILE)?)? {
        market.restore_account(account)?;
    }
    for item in parse_items(&read_file(dir, ITEMS_FILE)?)? {
        market.restore_item(item)?;
    }
    for order in parse_orders(&read_file(dir, TRANSACTIONS_FILE)?)? {
        market.restore_order(order)?;
    }
    for buyer in parse_buyers(&read_file(dir, BUYERS_FILE)?)? {
        market.restore_buyer(buyer)?;
    }
    for seller in parse_sellers(&read_file(dir, SELLERS_FILE)?)? {
        market.restore_seller(seller)?;
    }
    market.finish_restore()?;

    info!(
        dir = %dir.display(),
        accounts = market.ledger().len(),
        items = market.catalog().len(),
        orders = market.orders().count(),
        "snapshot loaded"
    );
    Ok(market)
}

fn read_file(dir: &Path, name: &str) -> Result<String, MarketError> {
    let path: PathBuf = dir.join(name);
    if !path.is_file() {
        return Err(MarketError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    Ok(fs::read_to_string(&path)?)
}

fn render_accounts(market: &Marketplace) -> Result<String, MarketError> {
    let mut out = String::new();
    for account in market.ledger().accounts() {
        let header = AccountRecord {
            id: account.id.clone(),
            owner: account.owner.clone(),
            balance: account.balance().to_string(),
        };
        write_record(&mut out, &header, RecordKind::Header)?;

        for entry in account.entries() {
            let detail = EntryRecord {
                account: account.id.clone(),
                date: entry.date.format(DATE_FORMAT).to_string(),
                amount: entry.amount.to_string(),
                note: entry.note.clone(),
            };
            write_record(&mut out, &detail, RecordKind::Detail)?;
        }
    }
    Ok(out)
}

fn render_items(market: &Marketplace) -> Result<String, MarketError> {
    let mut out = String::new();
    for item in market.items() {
        let record = ItemRecord {
            id: item.id.clone(),
            name: item.name.clone(),
            price: item.price.to_string(),
            stock: item.stock,
            sold: item.sold,
        };
        write_record(&mut out, &record, RecordKind::Header)?;
    }
    Ok(out)
}

fn render_buyers(market: &Marketplace) -> Result<String, MarketError> {
    let mut out = String::new();
    for buyer in market.buyers() {
        write_record(
            &mut out,
            &principal_record(&buyer.id, &buyer.username, &buyer.credential),
            RecordKind::Header,
        )?;
        for order in &buyer.orders {
            let record = BuyerOrderRecord {
                buyer: buyer.id.clone(),
                order: order.clone(),
            };
            write_record(&mut out, &record, RecordKind::Detail)?;
        }
    }
    Ok(out)
}

fn render_sellers(market: &Marketplace) -> Result<String, MarketError> {
    let mut out = String::new();
    for seller in market.sellers() {
        write_record(
            &mut out,
            &principal_record(&seller.id, &seller.username, &seller.credential),
            RecordKind::Header,
        )?;

        let items = seller.items.iter().map(|id| (SELLER_ITEM_TAG, id));
        let sales = seller.sales.iter().map(|id| (SELLER_SALE_TAG, id));
        for (tag, target) in items.chain(sales) {
            let record = SellerLinkRecord {
                seller: seller.id.clone(),
                tag: tag.to_string(),
                target: target.clone(),
            };
            write_record(&mut out, &record, RecordKind::Detail)?;
        }
    }
    Ok(out)
}

fn render_orders(market: &Marketplace) -> Result<String, MarketError> {
    let mut out = String::new();
    for order in market.orders() {
        let record = OrderRecord {
            id: order.id.clone(),
            date: order.date.format(DATE_FORMAT).to_string(),
            buyer: order.buyer.clone(),
            seller: order.seller.clone(),
            item: order.item.clone(),
            item_name: order.item_name.clone(),
            quantity: order.quantity,
            total: order.total.to_string(),
            status: order.status.code(),
        };
        write_record(&mut out, &record, RecordKind::Header)?;
    }
    Ok(out)
}

fn principal_record(id: &str, username: &str, credential: &str) -> PrincipalRecord {
    PrincipalRecord {
        id: id.to_string(),
        username: username.to_string(),
        credential: credential.to_string(),
    }
}

/// One record of a snapshot file, positioned for error reporting
struct Line<'a> {
    file: &'static str,
    number: u64,
    text: &'a str,
    kind: RecordKind,
}

impl Line<'_> {
    fn error(&self, message: impl Into<String>) -> MarketError {
        MarketError::parse_error(self.file, Some(self.number), message)
    }

    fn parse<T: DeserializeOwned>(&self) -> Result<T, MarketError> {
        read_record(self.text, self.kind).map_err(|e| self.error(e.to_string()))
    }

    fn decimal(&self, field: &str, value: &str) -> Result<Decimal, MarketError> {
        Decimal::from_str(value.trim())
            .map_err(|_| self.error(format!("invalid {} '{}'", field, value)))
    }

    fn date(&self, value: &str) -> Result<NaiveDate, MarketError> {
        parse_date(value).ok_or_else(|| self.error(format!("invalid date '{}'", value)))
    }

    fn expect_header(&self) -> Result<(), MarketError> {
        match self.kind {
            RecordKind::Header => Ok(()),
            RecordKind::Detail => Err(self.error("expected a '|' record")),
        }
    }

    /// Check that a detail record belongs to the header it follows
    fn expect_owner(&self, owner: Option<&str>, actual: &str) -> Result<(), MarketError> {
        match owner {
            Some(owner) if owner == actual => Ok(()),
            Some(owner) => Err(self.error(format!(
                "detail for {} found under header {}",
                actual, owner
            ))),
            None => Err(self.error("detail record before any header")),
        }
    }
}

fn lines<'a>(file: &'static str, text: &'a str) -> Result<Vec<Line<'a>>, MarketError> {
    split_records(text)
        .into_iter()
        .map(|(number, text)| {
            let kind = classify(text).ok_or_else(|| {
                MarketError::parse_error(file, Some(number), "record has no delimiter")
            })?;
            Ok(Line {
                file,
                number,
                text,
                kind,
            })
        })
        .collect()
}

fn parse_accounts(text: &str) -> Result<Vec<Account>, MarketError> {
    // Header fields and entries of the account being read
    struct Pending {
        record: AccountRecord,
        balance: Decimal,
        entries: Vec<LedgerEntry>,
    }

    fn finish(pending: Pending) -> Result<Account, MarketError> {
        Account::restore(
            &pending.record.id,
            &pending.record.owner,
            pending.balance,
            pending.entries,
        )
    }

    let mut accounts = Vec::new();
    let mut current: Option<Pending> = None;

    for line in lines(ACCOUNTS_FILE, text)? {
        match line.kind {
            RecordKind::Header => {
                let record: AccountRecord = line.parse()?;
                let balance = line.decimal("balance", &record.balance)?;
                if let Some(done) = current.take() {
                    accounts.push(finish(done)?);
                }
                current = Some(Pending {
                    record,
                    balance,
                    entries: Vec::new(),
                });
            }
            RecordKind::Detail => {
                let record: EntryRecord = line.parse()?;
                let pending = current.as_mut();
                line.expect_owner(pending.as_ref().map(|p| p.record.id.as_str()), &record.account)?;

                let entry = LedgerEntry {
                    date: line.date(&record.date)?,
                    amount: line.decimal("amount", &record.amount)?,
                    note: record.note,
                };
                if let Some(pending) = pending {
                    pending.entries.push(entry);
                }
            }
        }
    }

    if let Some(done) = current.take() {
        accounts.push(finish(done)?);
    }
    Ok(accounts)
}

fn parse_items(text: &str) -> Result<Vec<Item>, MarketError> {
    let mut items = Vec::new();

    for line in lines(ITEMS_FILE, text)? {
        line.expect_header()?;
        let record: ItemRecord = line.parse()?;
        let price = line.decimal("price", &record.price)?;

        let mut item = Item::new(&record.id, &record.name, price, record.stock);
        item.sold = record.sold;
        items.push(item);
    }
    Ok(items)
}

fn parse_orders(text: &str) -> Result<Vec<Order>, MarketError> {
    let mut orders = Vec::new();

    for line in lines(TRANSACTIONS_FILE, text)? {
        line.expect_header()?;
        let record: OrderRecord = line.parse()?;
        let status = OrderStatus::from_code(record.status)
            .ok_or_else(|| line.error(format!("unknown status code {}", record.status)))?;

        orders.push(Order {
            date: line.date(&record.date)?,
            total: line.decimal("total", &record.total)?,
            id: record.id,
            buyer: record.buyer,
            seller: record.seller,
            item: record.item,
            item_name: record.item_name,
            quantity: record.quantity,
            status,
        });
    }
    Ok(orders)
}

fn parse_buyers(text: &str) -> Result<Vec<Buyer>, MarketError> {
    let mut buyers: Vec<Buyer> = Vec::new();

    for line in lines(BUYERS_FILE, text)? {
        match line.kind {
            RecordKind::Header => {
                let record: PrincipalRecord = line.parse()?;
                buyers.push(Buyer::new(&record.id, &record.username, &record.credential));
            }
            RecordKind::Detail => {
                let record: BuyerOrderRecord = line.parse()?;
                let buyer = buyers.last_mut();
                line.expect_owner(buyer.as_ref().map(|b| b.id.as_str()), &record.buyer)?;
                if let Some(buyer) = buyer {
                    buyer.orders.push(record.order);
                }
            }
        }
    }
    Ok(buyers)
}

fn parse_sellers(text: &str) -> Result<Vec<Seller>, MarketError> {
    let mut sellers: Vec<Seller> = Vec::new();

    for line in lines(SELLERS_FILE, text)? {
        match line.kind {
            RecordKind::Header => {
                let record: PrincipalRecord = line.parse()?;
                sellers.push(Seller::new(&record.id, &record.username, &record.credential));
            }
            RecordKind::Detail => {
                let record: SellerLinkRecord = line.parse()?;
                let seller = sellers.last_mut();
                line.expect_owner(seller.as_ref().map(|s| s.id.as_str()), &record.seller)?;

                if let Some(seller) = seller {
                    match record.tag.as_str() {
                        SELLER_ITEM_TAG => seller.items.push(record.target),
                        SELLER_SALE_TAG => seller.sales.push(record.target),
                        other => return Err(line.error(format!("unknown seller tag '{}'", other))),
                    }
                }
            }
        }
    }
    Ok(sellers)
}
