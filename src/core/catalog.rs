//! Catalog of sellable items
//!
//! Items carry no back-reference to their seller. The catalog keeps an
//! owner index (item id → seller id) next to the item map so a purchase can
//! find the seller without scanning every seller's item list.

use crate::types::{AccountId, Item, ItemId, MarketError};
use std::collections::BTreeMap;

/// Item map plus the item → seller owner index
#[derive(Debug, Default)]
pub struct Catalog {
    items: BTreeMap<ItemId, Item>,
    owners: BTreeMap<ItemId, AccountId>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new item owned by `seller`
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the item identifier is taken.
    pub fn insert(&mut self, seller: &str, item: Item) -> Result<(), MarketError> {
        if self.items.contains_key(&item.id) {
            return Err(MarketError::already_exists("item", &item.id));
        }

        self.owners.insert(item.id.clone(), seller.to_string());
        self.items.insert(item.id.clone(), item);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Item> {
        self.items.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Seller that listed the item, if any
    pub fn owner_of(&self, id: &str) -> Option<&str> {
        self.owners.get(id).map(String::as_str)
    }

    /// All items in identifier order
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert an item read from a snapshot, without an owner yet
    pub(crate) fn insert_restored(&mut self, item: Item) -> Result<(), MarketError> {
        if self.items.contains_key(&item.id) {
            return Err(MarketError::already_exists("item", &item.id));
        }
        self.items.insert(item.id.clone(), item);
        Ok(())
    }

    /// Record `seller` as the owner of a restored item
    ///
    /// # Errors
    ///
    /// `DataIntegrity` if the item is unknown or already has an owner.
    pub(crate) fn assign_owner(&mut self, item: &str, seller: &str) -> Result<(), MarketError> {
        if !self.items.contains_key(item) {
            return Err(MarketError::data_integrity(format!(
                "seller {} lists unknown item {}",
                seller, item
            )));
        }

        if let Some(existing) = self.owners.get(item) {
            return Err(MarketError::data_integrity(format!(
                "item {} is listed by both {} and {}",
                item, existing, seller
            )));
        }

        self.owners.insert(item.to_string(), seller.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn sword() -> Item {
        Item::new("I1", "Sword", Decimal::new(50, 0), 10)
    }

    #[test]
    fn test_insert_records_owner() {
        let mut catalog = Catalog::new();
        catalog.insert("S1", sword()).unwrap();

        assert_eq!(catalog.owner_of("I1"), Some("S1"));
        assert_eq!(catalog.get("I1").unwrap().name, "Sword");
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_insert_duplicate_keeps_original() {
        let mut catalog = Catalog::new();
        catalog.insert("S1", sword()).unwrap();

        let result = catalog.insert("S2", Item::new("I1", "Other", Decimal::ONE, 1));
        assert!(matches!(result, Err(MarketError::AlreadyExists { .. })));
        assert_eq!(catalog.owner_of("I1"), Some("S1"));
        assert_eq!(catalog.get("I1").unwrap().name, "Sword");
    }

    #[test]
    fn test_assign_owner_rejects_unknown_and_double_owner() {
        let mut catalog = Catalog::new();
        catalog.insert_restored(sword()).unwrap();
        assert_eq!(catalog.owner_of("I1"), None);

        catalog.assign_owner("I1", "S1").unwrap();
        assert!(matches!(
            catalog.assign_owner("I1", "S2"),
            Err(MarketError::DataIntegrity { .. })
        ));
        assert!(matches!(
            catalog.assign_owner("I2", "S1"),
            Err(MarketError::DataIntegrity { .. })
        ));
    }
}
