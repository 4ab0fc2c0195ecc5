//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `identifier`: Identifier aliases and validation
//! - `account`: Ledger accounts and their entries
//! - `item`: Catalog items
//! - `order`: Orders and their status lifecycle
//! - `principal`: Buyers, sellers, and login results
//! - `error`: Error types for the marketplace

pub mod account;
pub mod error;
pub mod identifier;
pub mod item;
pub mod order;
pub mod principal;

pub use account::{Account, LedgerEntry};
pub use error::{ErrorCategory, MarketError};
pub use identifier::{validate_identifier, AccountId, ItemId, OrderId};
pub use item::Item;
pub use order::{Order, OrderStatus};
pub use principal::{Buyer, Principal, Seller};
