//! Marketplace Ledger Library
//! # Overview
//!
//! This library provides a small online marketplace settled through a
//! bank-style ledger, with flat-file snapshot persistence.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, Item, Order, Buyer, Seller, errors)
//! - [`core`] - Business logic components:
//!   - [`core::ledger`] - Accounts, deposits, withdrawals, transfers, ledger reports
//!   - [`core::catalog`] - Items and the item → seller owner index
//!   - [`core::marketplace`] - Registration, login, purchases, order reports
//! - [`io`] - Snapshot persistence
//! - [`config`] - Runtime configuration
//! - [`telemetry`] - Logging setup
//! - [`cli`] - CLI arguments parsing and command dispatch
//!
//! # Purchases
//!
//! A purchase is all-or-nothing. Every precondition (buyer, item, stock,
//! owning seller, ledger accounts, funds) is checked before anything is
//! written; on success the buyer pays the seller, stock moves to the sold
//! count, and a PAID order lands in both the buyer's and the seller's lists.
//!
//! # Account Invariants
//!
//! Each account maintains:
//! - `balance`: always equal to the sum of its entry amounts
//! - `entries`: append-only history of signed, dated, annotated movements

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod telemetry;
pub mod types;

pub use config::MarketConfig;
pub use core::{Catalog, Ledger, Marketplace};
pub use io::{load_snapshot, save_snapshot};
pub use types::{
    Account, AccountId, Buyer, ErrorCategory, Item, ItemId, LedgerEntry, MarketError, Order,
    OrderId, OrderStatus, Principal, Seller,
};
