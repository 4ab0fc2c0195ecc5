//! Error types for the marketplace ledger
//!
//! This module defines every error that a ledger, catalog, marketplace, or
//! snapshot operation can report. Errors are designed to be descriptive and
//! user-friendly for CLI output.
//!
//! # Error Categories
//!
//! Each variant belongs to one [`ErrorCategory`]:
//!
//! - **NotFound**: Missing account, item, buyer, seller, or order reference
//! - **AlreadyExists**: Duplicate identifier on create
//! - **InsufficientFunds** / **InsufficientStock**: Rejected settlement or sale
//! - **DataIntegrity**: Cross-references that do not line up (e.g. item with no owner)
//! - **InvalidInput**: Malformed identifiers, negative prices, zero quantities
//! - **Io**: Snapshot read/write failures and malformed snapshot records

use rust_decimal::Decimal;
use thiserror::Error;

/// Coarse error taxonomy shared by every [`MarketError`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    AlreadyExists,
    InsufficientFunds,
    InsufficientStock,
    DataIntegrity,
    InvalidInput,
    Io,
}

/// Main error type for the marketplace ledger
///
/// Every mutating operation returns `Result<_, MarketError>`. A returned
/// error guarantees that no account, item, principal, or order was modified.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarketError {
    /// No ledger account with the given identifier
    #[error("Account {account} not found")]
    AccountNotFound { account: String },

    /// No registered buyer with the given identifier
    #[error("Buyer {buyer} not found")]
    BuyerNotFound { buyer: String },

    /// No registered seller with the given identifier
    #[error("Seller {seller} not found")]
    SellerNotFound { seller: String },

    /// No catalog item with the given identifier
    #[error("Item {item} not found")]
    ItemNotFound { item: String },

    /// No buyer or seller matches the login credentials
    #[error("No principal matches username {username}")]
    PrincipalNotFound { username: String },

    /// No order with the given identifier
    #[error("Order {order} not found")]
    OrderNotFound { order: String },

    /// Identifier collision on create
    #[error("{kind} {id} already exists")]
    AlreadyExists {
        /// What was being created (account, buyer, seller, item)
        kind: String,
        /// The colliding identifier
        id: String,
    },

    /// Withdrawal or settlement larger than the current balance
    ///
    /// The account is left unchanged.
    #[error("Insufficient funds in account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: String,
        balance: Decimal,
        requested: Decimal,
    },

    /// Purchase quantity larger than the item's stock
    #[error("Insufficient stock for item {item}: stock {stock}, requested {requested}")]
    InsufficientStock {
        item: String,
        stock: u32,
        requested: u32,
    },

    /// Item exists in the catalog but no seller lists it
    #[error("Item {item} has no owning seller")]
    NoOwningSeller { item: String },

    /// Buyer is registered but has no ledger account
    #[error("Buyer {buyer} has no ledger account")]
    BuyerAccountMissing { buyer: String },

    /// Seller is registered but has no ledger account
    #[error("Seller {seller} has no ledger account")]
    SellerAccountMissing { seller: String },

    /// Balance, total, or counter arithmetic would overflow
    #[error("Arithmetic overflow in {operation} for {subject}")]
    ArithmeticOverflow { operation: String, subject: String },

    /// Rejected argument (bad identifier, negative price, zero quantity)
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Order status change that the lifecycle does not allow
    #[error("Order {order} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        order: String,
        from: String,
        to: String,
    },

    /// Seller tried to act on an order that belongs to another seller
    #[error("Order {order} was not sold by seller {seller}")]
    NotOrderSeller { order: String, seller: String },

    /// Persisted or in-memory cross-references are inconsistent
    #[error("Data integrity failure: {message}")]
    DataIntegrity { message: String },

    /// Snapshot file or directory does not exist
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// I/O error while reading or writing a snapshot
    #[error("I/O error: {message}")]
    IoError { message: String },

    /// Malformed snapshot record
    #[error("Parse error in {file}{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Snapshot file name
        file: String,
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl From<std::io::Error> for MarketError {
    fn from(error: std::io::Error) -> Self {
        MarketError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for MarketError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        MarketError::ParseError {
            file: String::new(),
            line,
            message: error.to_string(),
        }
    }
}

impl MarketError {
    /// Map the variant onto the error taxonomy
    pub fn category(&self) -> ErrorCategory {
        match self {
            MarketError::AccountNotFound { .. }
            | MarketError::BuyerNotFound { .. }
            | MarketError::SellerNotFound { .. }
            | MarketError::ItemNotFound { .. }
            | MarketError::OrderNotFound { .. }
            | MarketError::PrincipalNotFound { .. }
            | MarketError::BuyerAccountMissing { .. }
            | MarketError::SellerAccountMissing { .. } => ErrorCategory::NotFound,
            MarketError::AlreadyExists { .. } => ErrorCategory::AlreadyExists,
            MarketError::InsufficientFunds { .. } => ErrorCategory::InsufficientFunds,
            MarketError::InsufficientStock { .. } => ErrorCategory::InsufficientStock,
            MarketError::NoOwningSeller { .. }
            | MarketError::ArithmeticOverflow { .. }
            | MarketError::DataIntegrity { .. } => ErrorCategory::DataIntegrity,
            MarketError::InvalidInput { .. }
            | MarketError::InvalidStatusTransition { .. }
            | MarketError::NotOrderSeller { .. } => ErrorCategory::InvalidInput,
            MarketError::FileNotFound { .. }
            | MarketError::IoError { .. }
            | MarketError::ParseError { .. } => ErrorCategory::Io,
        }
    }

    pub fn account_not_found(account: &str) -> Self {
        MarketError::AccountNotFound {
            account: account.to_string(),
        }
    }

    pub fn buyer_not_found(buyer: &str) -> Self {
        MarketError::BuyerNotFound {
            buyer: buyer.to_string(),
        }
    }

    pub fn seller_not_found(seller: &str) -> Self {
        MarketError::SellerNotFound {
            seller: seller.to_string(),
        }
    }

    pub fn item_not_found(item: &str) -> Self {
        MarketError::ItemNotFound {
            item: item.to_string(),
        }
    }

    pub fn order_not_found(order: &str) -> Self {
        MarketError::OrderNotFound {
            order: order.to_string(),
        }
    }

    pub fn already_exists(kind: &str, id: &str) -> Self {
        MarketError::AlreadyExists {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    pub fn insufficient_funds(account: &str, balance: Decimal, requested: Decimal) -> Self {
        MarketError::InsufficientFunds {
            account: account.to_string(),
            balance,
            requested,
        }
    }

    pub fn insufficient_stock(item: &str, stock: u32, requested: u32) -> Self {
        MarketError::InsufficientStock {
            item: item.to_string(),
            stock,
            requested,
        }
    }

    pub fn arithmetic_overflow(operation: &str, subject: &str) -> Self {
        MarketError::ArithmeticOverflow {
            operation: operation.to_string(),
            subject: subject.to_string(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        MarketError::InvalidInput {
            message: message.into(),
        }
    }

    pub fn data_integrity(message: impl Into<String>) -> Self {
        MarketError::DataIntegrity {
            message: message.into(),
        }
    }

    /// Create a ParseError for a snapshot file line
    pub fn parse_error(file: &str, line: Option<u64>, message: impl Into<String>) -> Self {
        MarketError::ParseError {
            file: file.to_string(),
            line,
            message: message.into(),
        }
    }
}
