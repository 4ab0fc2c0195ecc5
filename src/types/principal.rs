//! Buyer and seller records
//!
//! Credentials are stored and compared as plain text; the marketplace only
//! needs a lookup, not a security model.

use super::identifier::{AccountId, ItemId, OrderId};

/// Registered buyer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buyer {
    pub id: AccountId,
    pub username: String,
    pub credential: String,
    /// Orders placed, in purchase order
    pub orders: Vec<OrderId>,
}

impl Buyer {
    pub fn new(id: &str, username: &str, credential: &str) -> Self {
        Buyer {
            id: id.to_string(),
            username: username.to_string(),
            credential: credential.to_string(),
            orders: Vec::new(),
        }
    }
}

/// Registered seller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seller {
    pub id: AccountId,
    pub username: String,
    pub credential: String,
    /// Items listed by this seller, in listing order
    pub items: Vec<ItemId>,
    /// Orders sold, in sale order
    pub sales: Vec<OrderId>,
}

impl Seller {
    pub fn new(id: &str, username: &str, credential: &str) -> Self {
        Seller {
            id: id.to_string(),
            username: username.to_string(),
            credential: credential.to_string(),
            items: Vec::new(),
            sales: Vec::new(),
        }
    }
}

/// Result of a successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Buyer(AccountId),
    Seller(AccountId),
}

impl Principal {
    pub fn id(&self) -> &str {
        match self {
            Principal::Buyer(id) | Principal::Seller(id) => id,
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Principal::Buyer(_) => "buyer",
            Principal::Seller(_) => "seller",
        }
    }
}
