//! Catalog item type

use super::error::MarketError;
use super::identifier::ItemId;
use rust_decimal::Decimal;

/// Sellable item with price, stock, and cumulative sold count
///
/// The item does not record its seller; ownership lives in the seller's
/// item list and the catalog's owner index.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    /// Unit price, never negative
    pub price: Decimal,
    /// Units on hand
    pub stock: u32,
    /// Units sold over the item's lifetime (never decreases)
    pub sold: u32,
}

impl Item {
    /// Create an item that has not sold anything yet
    pub fn new(id: &str, name: &str, price: Decimal, stock: u32) -> Self {
        Item {
            id: id.to_string(),
            name: name.to_string(),
            price,
            stock,
            sold: 0,
        }
    }

    /// Whether `quantity` units are on hand
    pub fn can_sell(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }

    /// Move `quantity` units from stock to sold
    pub(crate) fn sell(&mut self, quantity: u32) -> Result<(), MarketError> {
        if !self.can_sell(quantity) {
            return Err(MarketError::insufficient_stock(&self.id, self.stock, quantity));
        }

        let sold = self
            .sold
            .checked_add(quantity)
            .ok_or_else(|| MarketError::arithmetic_overflow("sell", &self.id))?;

        self.stock -= quantity;
        self.sold = sold;
        Ok(())
    }

    /// Add units to stock
    pub(crate) fn replenish(&mut self, quantity: u32) -> Result<(), MarketError> {
        self.stock = self
            .stock
            .checked_add(quantity)
            .ok_or_else(|| MarketError::arithmetic_overflow("replenish", &self.id))?;
        Ok(())
    }

    /// Remove units from stock, flooring at zero
    pub(crate) fn discard(&mut self, quantity: u32) {
        self.stock = self.stock.saturating_sub(quantity);
    }
}
