//! Marketplace orchestration
//!
//! This module provides the `Marketplace` that owns buyers, sellers, the
//! catalog, orders, and the ledger used to settle purchases.
//!
//! The marketplace enforces business rules such as:
//! - Buyers, sellers, and ledger accounts share one identifier space
//! - Only the owning seller may change an item's stock or price
//! - A purchase either fully commits (funds, stock, order, id lists) or
//!   leaves every record untouched

use crate::core::catalog::Catalog;
use crate::core::clock::{days_between, system_clock, SharedClock};
use crate::core::ids::{OrderIdGenerator, DEFAULT_ORDER_PREFIX};
use crate::core::ledger::Ledger;
use crate::core::ranking::top_n;
use crate::types::{
    validate_identifier, Account, AccountId, Buyer, Item, MarketError, Order, OrderId,
    OrderStatus, Principal, Seller,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Everything a purchase needs, resolved before anything is mutated
struct PurchasePlan {
    seller: AccountId,
    item_name: String,
    total: Decimal,
}

/// Buyers, sellers, catalog, orders, and the settlement ledger
pub struct Marketplace {
    ledger: Ledger,
    catalog: Catalog,
    buyers: BTreeMap<AccountId, Buyer>,
    sellers: BTreeMap<AccountId, Seller>,
    orders: BTreeMap<OrderId, Order>,
    order_ids: OrderIdGenerator,
}

impl Marketplace {
    /// Create an empty marketplace with its own empty ledger
    pub fn new(clock: SharedClock) -> Self {
        Self::with_order_prefix(clock, DEFAULT_ORDER_PREFIX)
    }

    /// Create an empty marketplace whose order ids start with `prefix`
    pub fn with_order_prefix(clock: SharedClock, prefix: &str) -> Self {
        Marketplace {
            ledger: Ledger::new(clock),
            catalog: Catalog::new(),
            buyers: BTreeMap::new(),
            sellers: BTreeMap::new(),
            orders: BTreeMap::new(),
            order_ids: OrderIdGenerator::new(prefix),
        }
    }

    /// Current calendar day according to the marketplace clock
    pub fn today(&self) -> NaiveDate {
        self.ledger.today()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Mutable ledger access for top-ups, withdrawals, and house accounts
    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn buyer(&self, id: &str) -> Option<&Buyer> {
        self.buyers.get(id)
    }

    pub fn seller(&self, id: &str) -> Option<&Seller> {
        self.sellers.get(id)
    }

    pub fn order(&self, id: &str) -> Option<&Order> {
        self.orders.get(id)
    }

    /// All buyers in identifier order
    pub fn buyers(&self) -> impl Iterator<Item = &Buyer> {
        self.buyers.values()
    }

    /// All sellers in identifier order
    pub fn sellers(&self) -> impl Iterator<Item = &Seller> {
        self.sellers.values()
    }

    /// All orders in identifier order
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    /// All catalog items in identifier order
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.catalog.items()
    }

    /// Register a buyer and open a zero-balance ledger account under the same id
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the identifier is malformed
    /// - `AlreadyExists` if a buyer, seller, or ledger account already uses the id
    pub fn register_buyer(
        &mut self,
        id: &str,
        username: &str,
        credential: &str,
    ) -> Result<(), MarketError> {
        self.check_principal_id_free("buyer", id)?;

        self.ledger.open_account(id, username, Decimal::ZERO)?;
        self.buyers
            .insert(id.to_string(), Buyer::new(id, username, credential));

        info!(buyer = id, username, "registered buyer");
        Ok(())
    }

    /// Register a seller and open a zero-balance ledger account under the same id
    ///
    /// # Errors
    ///
    /// Same as [`Marketplace::register_buyer`].
    pub fn register_seller(
        &mut self,
        id: &str,
        username: &str,
        credential: &str,
    ) -> Result<(), MarketError> {
        self.check_principal_id_free("seller", id)?;

        self.ledger.open_account(id, username, Decimal::ZERO)?;
        self.sellers
            .insert(id.to_string(), Seller::new(id, username, credential));

        info!(seller = id, username, "registered seller");
        Ok(())
    }

    fn check_principal_id_free(&self, kind: &str, id: &str) -> Result<(), MarketError> {
        validate_identifier(kind, id)?;

        if self.buyers.contains_key(id) || self.sellers.contains_key(id) {
            return Err(MarketError::already_exists(kind, id));
        }
        if self.ledger.contains(id) {
            return Err(MarketError::already_exists("account", id));
        }
        Ok(())
    }

    /// Find the principal whose username and credential both match exactly
    ///
    /// Buyers are searched before sellers. Comparison is case-sensitive.
    pub fn login(&self, username: &str, credential: &str) -> Result<Principal, MarketError> {
        let buyer = self
            .buyers
            .values()
            .find(|b| b.username == username && b.credential == credential)
            .map(|b| Principal::Buyer(b.id.clone()));

        let principal = buyer.or_else(|| {
            self.sellers
                .values()
                .find(|s| s.username == username && s.credential == credential)
                .map(|s| Principal::Seller(s.id.clone()))
        });

        principal.ok_or_else(|| MarketError::PrincipalNotFound {
            username: username.to_string(),
        })
    }

    /// List a new item for `seller`
    ///
    /// # Errors
    ///
    /// - `SellerNotFound` if the seller is not registered
    /// - `InvalidInput` if the item id is malformed or the price is negative
    /// - `AlreadyExists` if the item id is taken
    pub fn add_item(
        &mut self,
        seller_id: &str,
        item_id: &str,
        name: &str,
        price: Decimal,
        stock: u32,
    ) -> Result<(), MarketError> {
        let seller = self
            .sellers
            .get_mut(seller_id)
            .ok_or_else(|| MarketError::seller_not_found(seller_id))?;

        validate_identifier("item", item_id)?;
        check_price(item_id, price)?;

        self.catalog
            .insert(seller_id, Item::new(item_id, name, price, stock))?;
        seller.items.push(item_id.to_string());

        info!(seller = seller_id, item = item_id, name, %price, stock, "listed item");
        Ok(())
    }

    /// Add `quantity` units to an item's stock
    pub fn replenish_item(
        &mut self,
        seller_id: &str,
        item_id: &str,
        quantity: u32,
    ) -> Result<(), MarketError> {
        self.owned_item_mut(seller_id, item_id)?.replenish(quantity)
    }

    /// Remove up to `quantity` units from an item's stock
    ///
    /// Over-discarding floors the stock at zero instead of failing.
    pub fn discard_item(
        &mut self,
        seller_id: &str,
        item_id: &str,
        quantity: u32,
    ) -> Result<(), MarketError> {
        self.owned_item_mut(seller_id, item_id)?.discard(quantity);
        Ok(())
    }

    /// Change an item's unit price
    pub fn set_item_price(
        &mut self,
        seller_id: &str,
        item_id: &str,
        price: Decimal,
    ) -> Result<(), MarketError> {
        check_price(item_id, price)?;
        self.owned_item_mut(seller_id, item_id)?.price = price;
        Ok(())
    }

    /// Resolve an item that `seller_id` is allowed to change
    ///
    /// Items listed by another seller are reported as not found.
    fn owned_item_mut(&mut self, seller_id: &str, item_id: &str) -> Result<&mut Item, MarketError> {
        if !self.sellers.contains_key(seller_id) {
            return Err(MarketError::seller_not_found(seller_id));
        }

        if self.catalog.owner_of(item_id) != Some(seller_id) {
            return Err(MarketError::item_not_found(item_id));
        }

        self.catalog
            .get_mut(item_id)
            .ok_or_else(|| MarketError::item_not_found(item_id))
    }

    /// Buy `quantity` units of an item
    ///
    /// The buyer pays `price × quantity` to the item's seller, the item's
    /// stock moves to its sold count, and a PAID order is recorded in both
    /// the buyer's order list and the seller's sale list.
    ///
    /// # Returns
    ///
    /// The id of the new order.
    ///
    /// # Errors
    ///
    /// Returns an error, with nothing modified, if:
    /// - `quantity` is zero (`InvalidInput`)
    /// - the buyer or item is unknown (`BuyerNotFound`, `ItemNotFound`)
    /// - the item has fewer than `quantity` units (`InsufficientStock`)
    /// - no seller owns the item (`NoOwningSeller`)
    /// - the buyer or seller has no ledger account (`BuyerAccountMissing`,
    ///   `SellerAccountMissing`)
    /// - the buyer cannot cover the total (`InsufficientFunds`)
    pub fn purchase(
        &mut self,
        buyer_id: &str,
        item_id: &str,
        quantity: u32,
        date: NaiveDate,
    ) -> Result<OrderId, MarketError> {
        let plan = self
            .plan_purchase(buyer_id, item_id, quantity)
            .inspect_err(|e| {
                warn!(buyer = buyer_id, item = item_id, quantity, error = %e, "purchase rejected")
            })?;

        // Resolve every record the commit touches before the first write
        let buyer = self
            .buyers
            .get_mut(buyer_id)
            .ok_or_else(|| MarketError::buyer_not_found(buyer_id))?;
        let seller = self
            .sellers
            .get_mut(&plan.seller)
            .ok_or_else(|| MarketError::NoOwningSeller {
                item: item_id.to_string(),
            })?;
        let item = self
            .catalog
            .get_mut(item_id)
            .ok_or_else(|| MarketError::item_not_found(item_id))?;

        self.ledger.transfer(
            buyer_id,
            &plan.seller,
            plan.total,
            date,
            &format!("purchase {}", item_id),
            &format!("sale {}", item_id),
        )?;
        item.sell(quantity)?;

        let orders = &mut self.orders;
        let order_id = self.order_ids.next_id(|id| orders.contains_key(id));
        orders.insert(
            order_id.clone(),
            Order {
                id: order_id.clone(),
                date,
                buyer: buyer_id.to_string(),
                seller: plan.seller.clone(),
                item: item_id.to_string(),
                item_name: plan.item_name,
                quantity,
                total: plan.total,
                status: OrderStatus::Paid,
            },
        );
        buyer.orders.push(order_id.clone());
        seller.sales.push(order_id.clone());

        info!(
            order = %order_id,
            buyer = buyer_id,
            seller = %plan.seller,
            item = item_id,
            quantity,
            total = %plan.total,
            "purchase committed"
        );
        Ok(order_id)
    }

    /// Run every purchase precondition without mutating anything
    fn plan_purchase(
        &self,
        buyer_id: &str,
        item_id: &str,
        quantity: u32,
    ) -> Result<PurchasePlan, MarketError> {
        if quantity == 0 {
            return Err(MarketError::invalid_input("purchase quantity must be positive"));
        }

        if !self.buyers.contains_key(buyer_id) {
            return Err(MarketError::buyer_not_found(buyer_id));
        }
        let item = self
            .catalog
            .get(item_id)
            .ok_or_else(|| MarketError::item_not_found(item_id))?;

        if !item.can_sell(quantity) {
            return Err(MarketError::insufficient_stock(item_id, item.stock, quantity));
        }
        item.sold
            .checked_add(quantity)
            .ok_or_else(|| MarketError::arithmetic_overflow("sell", item_id))?;

        let total = item
            .price
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(|| MarketError::arithmetic_overflow("purchase total", item_id))?;

        let seller = self
            .catalog
            .owner_of(item_id)
            .filter(|seller| self.sellers.contains_key(*seller))
            .ok_or_else(|| MarketError::NoOwningSeller {
                item: item_id.to_string(),
            })?;

        if !self.ledger.contains(buyer_id) {
            return Err(MarketError::BuyerAccountMissing {
                buyer: buyer_id.to_string(),
            });
        }
        if !self.ledger.contains(seller) {
            return Err(MarketError::SellerAccountMissing {
                seller: seller.to_string(),
            });
        }

        self.ledger.check_transfer(buyer_id, seller, total)?;

        Ok(PurchasePlan {
            seller: seller.to_string(),
            item_name: item.name.clone(),
            total,
        })
    }

    /// Mark a PAID order as COMPLETED
    ///
    /// # Errors
    ///
    /// - `SellerNotFound` / `OrderNotFound` for unknown ids
    /// - `NotOrderSeller` if the order was sold by someone else
    /// - `InvalidStatusTransition` if the order is not PAID
    pub fn complete_order(&mut self, seller_id: &str, order_id: &str) -> Result<(), MarketError> {
        if !self.sellers.contains_key(seller_id) {
            return Err(MarketError::seller_not_found(seller_id));
        }

        let order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| MarketError::order_not_found(order_id))?;

        if order.seller != seller_id {
            return Err(MarketError::NotOrderSeller {
                order: order_id.to_string(),
                seller: seller_id.to_string(),
            });
        }

        if order.status != OrderStatus::Paid {
            return Err(MarketError::InvalidStatusTransition {
                order: order_id.to_string(),
                from: order.status.to_string(),
                to: OrderStatus::Completed.to_string(),
            });
        }

        order.status = OrderStatus::Completed;
        info!(order = order_id, seller = seller_id, "order completed");
        Ok(())
    }

    /// Orders dated at most `days` before today, in order-id order
    pub fn list_orders_within_last_days(&self, days: u32) -> Vec<&Order> {
        let today = self.today();
        self.orders
            .values()
            .filter(|order| days_between(today, order.date) <= i64::from(days))
            .collect()
    }

    /// Orders still in PAID status
    pub fn list_paid_orders(&self) -> Vec<&Order> {
        self.orders
            .values()
            .filter(|order| order.status == OrderStatus::Paid)
            .collect()
    }

    /// Item names ranked by sold count, ties in item-id order
    pub fn most_sold_items(&self, m: usize) -> Vec<(String, u32)> {
        top_n(
            self.catalog.items().map(|item| (item.name.clone(), item.sold)),
            m,
        )
    }

    /// Buyers ranked by the number of orders dated today
    pub fn most_active_buyers_today(&self, n: usize) -> Vec<(AccountId, usize)> {
        self.rank_today(n, |order| &order.buyer)
    }

    /// Sellers ranked by the number of orders dated today
    pub fn most_active_sellers_today(&self, n: usize) -> Vec<(AccountId, usize)> {
        self.rank_today(n, |order| &order.seller)
    }

    fn rank_today<'a>(
        &'a self,
        n: usize,
        principal: impl Fn(&'a Order) -> &'a AccountId,
    ) -> Vec<(AccountId, usize)> {
        let today = self.today();
        let mut counts: BTreeMap<&AccountId, usize> = BTreeMap::new();

        for order in self.orders.values().filter(|order| order.date == today) {
            *counts.entry(principal(order)).or_default() += 1;
        }

        top_n(counts.into_iter().map(|(id, count)| (id.clone(), count)), n)
    }

    /// Orders placed by a buyer, in purchase order
    pub fn orders_for_buyer(&self, buyer_id: &str) -> Result<Vec<&Order>, MarketError> {
        let buyer = self
            .buyers
            .get(buyer_id)
            .ok_or_else(|| MarketError::buyer_not_found(buyer_id))?;

        Ok(buyer
            .orders
            .iter()
            .filter_map(|id| self.orders.get(id))
            .collect())
    }

    /// Items listed by a seller, in listing order
    pub fn items_for_seller(&self, seller_id: &str) -> Result<Vec<&Item>, MarketError> {
        let seller = self
            .sellers
            .get(seller_id)
            .ok_or_else(|| MarketError::seller_not_found(seller_id))?;

        Ok(seller
            .items
            .iter()
            .filter_map(|id| self.catalog.get(id))
            .collect())
    }

    /// Total a buyer paid for orders dated at most `days` before today
    pub fn buyer_spending_within_last_days(
        &self,
        buyer_id: &str,
        days: u32,
    ) -> Result<Decimal, MarketError> {
        let today = self.today();

        Ok(self
            .orders_for_buyer(buyer_id)?
            .into_iter()
            .filter(|order| days_between(today, order.date) <= i64::from(days))
            .map(|order| order.total)
            .sum())
    }

    /// Populate a small demo store
    ///
    /// Registers seller `S1` and buyer `B1`, lists two items, and tops up the
    /// buyer with 200. Nothing is created if any of the ids is already taken.
    pub fn seed_demo(&mut self) -> Result<(), MarketError> {
        for id in ["S1", "B1"] {
            self.check_principal_id_free("principal", id)?;
        }
        for id in ["I1", "I2"] {
            if self.catalog.contains(id) {
                return Err(MarketError::already_exists("item", id));
            }
        }

        let today = self.today();
        self.register_seller("S1", "alice_seller", "123")?;
        self.register_buyer("B1", "bob_buyer", "123")?;
        self.add_item("S1", "I1", "Sword", Decimal::new(50, 0), 10)?;
        self.add_item("S1", "I2", "Shield", Decimal::new(30, 0), 5)?;
        self.ledger
            .deposit("B1", Decimal::new(200, 0), today, "topup demo")?;
        self.ledger.deposit("S1", Decimal::ZERO, today, "seller start")?;

        info!("seeded demo data");
        Ok(())
    }

    /// Insert a ledger account read from a snapshot
    pub(crate) fn restore_account(&mut self, account: Account) -> Result<(), MarketError> {
        self.ledger.insert_restored(account)
    }

    /// Insert an item read from a snapshot
    pub(crate) fn restore_item(&mut self, item: Item) -> Result<(), MarketError> {
        self.catalog.insert_restored(item)
    }

    pub(crate) fn restore_buyer(&mut self, buyer: Buyer) -> Result<(), MarketError> {
        if self.buyers.contains_key(&buyer.id) || self.sellers.contains_key(&buyer.id) {
            return Err(MarketError::already_exists("buyer", &buyer.id));
        }
        self.buyers.insert(buyer.id.clone(), buyer);
        Ok(())
    }

    pub(crate) fn restore_seller(&mut self, seller: Seller) -> Result<(), MarketError> {
        if self.buyers.contains_key(&seller.id) || self.sellers.contains_key(&seller.id) {
            return Err(MarketError::already_exists("seller", &seller.id));
        }
        self.sellers.insert(seller.id.clone(), seller);
        Ok(())
    }

    pub(crate) fn restore_order(&mut self, order: Order) -> Result<(), MarketError> {
        if self.orders.contains_key(&order.id) {
            return Err(MarketError::already_exists("order", &order.id));
        }
        self.order_ids.observe(&order.id);
        self.orders.insert(order.id.clone(), order);
        Ok(())
    }

    /// Cross-check restored records and rebuild derived state
    ///
    /// Rebuilds the item owner index from the seller item lists, opens a
    /// zero-balance ledger account for any principal without one, and checks
    /// that every order id in a buyer or seller list exists.
    pub(crate) fn finish_restore(&mut self) -> Result<(), MarketError> {
        for seller in self.sellers.values() {
            for item in &seller.items {
                self.catalog.assign_owner(item, &seller.id)?;
            }
        }

        let listed = self
            .buyers
            .values()
            .flat_map(|b| b.orders.iter().map(move |o| (&b.id, o)))
            .chain(
                self.sellers
                    .values()
                    .flat_map(|s| s.sales.iter().map(move |o| (&s.id, o))),
            );
        for (principal, order) in listed {
            if !self.orders.contains_key(order) {
                return Err(MarketError::data_integrity(format!(
                    "{} references unknown order {}",
                    principal, order
                )));
            }
        }

        let missing: Vec<(AccountId, String)> = self
            .buyers
            .values()
            .map(|b| (&b.id, &b.username))
            .chain(self.sellers.values().map(|s| (&s.id, &s.username)))
            .filter(|(id, _)| !self.ledger.contains(id))
            .map(|(id, name)| (id.clone(), name.clone()))
            .collect();

        for (id, name) in missing {
            warn!(account = %id, "principal had no ledger account; opening an empty one");
            self.ledger.open_account(&id, &name, Decimal::ZERO)?;
        }

        Ok(())
    }
}

impl Default for Marketplace {
    fn default() -> Self {
        Self::new(system_clock())
    }
}

fn check_price(item_id: &str, price: Decimal) -> Result<(), MarketError> {
    if price < Decimal::ZERO {
        return Err(MarketError::invalid_input(format!(
            "price {} for item {} is negative",
            price, item_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::FixedClock;
    use crate::types::ErrorCategory;
    use rstest::rstest;
    use std::sync::Arc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    fn dec(value: i64) -> Decimal {
        Decimal::new(value, 0)
    }

    fn market() -> Marketplace {
        Marketplace::new(Arc::new(FixedClock(today())))
    }

    /// Seller S1 lists I1 (price 50, stock 10); buyer B1 holds `funds`
    fn market_with_sword(funds: i64) -> Marketplace {
        let mut market = market();
        market.register_seller("S1", "sue", "pw").unwrap();
        market.register_buyer("B1", "bob", "pw").unwrap();
        market.add_item("S1", "I1", "Sword", dec(50), 10).unwrap();
        market
            .ledger_mut()
            .deposit("B1", dec(funds), today(), "topup")
            .unwrap();
        market
    }

    /// Observable state used to prove a failed call changed nothing
    fn fingerprint(market: &Marketplace) -> String {
        let accounts: Vec<_> = market
            .ledger()
            .accounts()
            .map(|a| (a.id.clone(), a.balance(), a.entries().len()))
            .collect();
        let items: Vec<_> = market.items().map(|i| (i.id.clone(), i.stock, i.sold)).collect();
        let buyers: Vec<_> = market.buyers().map(|b| b.orders.clone()).collect();
        let sellers: Vec<_> = market.sellers().map(|s| s.sales.clone()).collect();
        format!(
            "{:?}{:?}{:?}{:?}{}",
            accounts,
            items,
            buyers,
            sellers,
            market.orders().count()
        )
    }

    #[test]
    fn test_register_opens_ledger_account() {
        let mut market = market();
        market.register_buyer("B1", "bob", "pw").unwrap();

        let account = market.ledger().get("B1").unwrap();
        assert_eq!(account.owner, "bob");
        assert_eq!(account.balance(), Decimal::ZERO);
    }

    #[test]
    fn test_register_rejects_duplicate_ids_across_roles() {
        let mut market = market();
        market.register_buyer("X1", "bob", "pw").unwrap();

        assert!(matches!(
            market.register_buyer("X1", "bob2", "pw"),
            Err(MarketError::AlreadyExists { .. })
        ));
        assert!(matches!(
            market.register_seller("X1", "sue", "pw"),
            Err(MarketError::AlreadyExists { .. })
        ));

        market
            .ledger_mut()
            .open_account("H1", "house", Decimal::ZERO)
            .unwrap();
        assert!(matches!(
            market.register_seller("H1", "sue", "pw"),
            Err(MarketError::AlreadyExists { .. })
        ));
        assert!(market.seller("H1").is_none());
    }

    #[test]
    fn test_login_matches_exactly_and_prefers_buyers() {
        let mut market = market();
        market.register_seller("S1", "sam", "pw").unwrap();
        market.register_buyer("B1", "sam", "pw").unwrap();
        market.register_seller("S2", "sue", "secret").unwrap();

        assert_eq!(
            market.login("sam", "pw").unwrap(),
            Principal::Buyer("B1".to_string())
        );
        assert_eq!(
            market.login("sue", "secret").unwrap(),
            Principal::Seller("S2".to_string())
        );
        assert!(matches!(
            market.login("SUE", "secret"),
            Err(MarketError::PrincipalNotFound { .. })
        ));
        assert!(market.login("sue", "Secret").is_err());
    }

    #[test]
    fn test_add_item_errors() {
        let mut market = market();
        market.register_seller("S1", "sue", "pw").unwrap();
        market.add_item("S1", "I1", "Sword", dec(50), 10).unwrap();

        assert!(matches!(
            market.add_item("S9", "I2", "Bow", dec(5), 1),
            Err(MarketError::SellerNotFound { .. })
        ));
        assert!(matches!(
            market.add_item("S1", "I1", "Again", dec(5), 1),
            Err(MarketError::AlreadyExists { .. })
        ));
        assert!(matches!(
            market.add_item("S1", "I3", "Cursed", dec(-1), 1),
            Err(MarketError::InvalidInput { .. })
        ));
        assert_eq!(market.seller("S1").unwrap().items, vec!["I1".to_string()]);
    }

    #[test]
    fn test_replenish_discard_and_price() {
        let mut market = market_with_sword(0);

        market.replenish_item("S1", "I1", 5).unwrap();
        assert_eq!(market.catalog().get("I1").unwrap().stock, 15);

        market.discard_item("S1", "I1", 4).unwrap();
        assert_eq!(market.catalog().get("I1").unwrap().stock, 11);

        market.discard_item("S1", "I1", 100).unwrap();
        assert_eq!(market.catalog().get("I1").unwrap().stock, 0);

        market.set_item_price("S1", "I1", dec(75)).unwrap();
        assert_eq!(market.catalog().get("I1").unwrap().price, dec(75));
    }

    #[test]
    fn test_catalog_changes_require_owning_seller() {
        let mut market = market_with_sword(0);
        market.register_seller("S2", "sid", "pw").unwrap();

        assert!(matches!(
            market.replenish_item("S2", "I1", 1),
            Err(MarketError::ItemNotFound { .. })
        ));
        assert!(matches!(
            market.set_item_price("S9", "I1", dec(1)),
            Err(MarketError::SellerNotFound { .. })
        ));
        assert!(matches!(
            market.discard_item("S1", "NOPE", 1),
            Err(MarketError::ItemNotFound { .. })
        ));
        assert_eq!(market.catalog().get("I1").unwrap().stock, 10);
    }

    #[test]
    fn test_purchase_success_scenario() {
        let mut market = market_with_sword(200);

        let order_id = market.purchase("B1", "I1", 3, today()).unwrap();

        assert_eq!(market.ledger().balance("B1").unwrap(), dec(50));
        assert_eq!(market.ledger().balance("S1").unwrap(), dec(150));

        let item = market.catalog().get("I1").unwrap();
        assert_eq!(item.stock, 7);
        assert_eq!(item.sold, 3);

        let order = market.order(&order_id).unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.total, dec(150));
        assert_eq!(order.quantity, 3);
        assert_eq!(order.item_name, "Sword");
        assert_eq!(order.seller, "S1");
        assert_eq!(market.orders().count(), 1);

        assert_eq!(market.buyer("B1").unwrap().orders, vec![order_id.clone()]);
        assert_eq!(market.seller("S1").unwrap().sales, vec![order_id]);

        let buyer_entry = market.ledger().get("B1").unwrap().entries().last().unwrap();
        assert_eq!(buyer_entry.amount, dec(-150));
        assert_eq!(buyer_entry.note, "purchase I1");
        let seller_entry = market.ledger().get("S1").unwrap().entries().last().unwrap();
        assert_eq!(seller_entry.note, "sale I1");
    }

    #[test]
    fn test_purchase_insufficient_funds_changes_nothing() {
        let mut market = market_with_sword(40);
        let before = fingerprint(&market);

        let result = market.purchase("B1", "I1", 5, today());

        assert!(matches!(result, Err(MarketError::InsufficientFunds { .. })));
        assert_eq!(fingerprint(&market), before);
        assert_eq!(market.ledger().balance("B1").unwrap(), dec(40));
    }

    #[rstest]
    #[case::zero_quantity("B1", "I1", 0, ErrorCategory::InvalidInput)]
    #[case::unknown_buyer("B9", "I1", 1, ErrorCategory::NotFound)]
    #[case::unknown_item("B1", "I7", 1, ErrorCategory::NotFound)]
    #[case::short_stock("B1", "I1", 11, ErrorCategory::InsufficientStock)]
    #[case::no_owner("B1", "I9", 1, ErrorCategory::DataIntegrity)]
    fn test_purchase_precondition_failures_change_nothing(
        #[case] buyer: &str,
        #[case] item: &str,
        #[case] quantity: u32,
        #[case] expected: ErrorCategory,
    ) {
        let mut market = market_with_sword(10_000);
        // Item present in the catalog but not listed by any seller
        market
            .catalog
            .insert_restored(Item::new("I9", "Orphan", dec(1), 5))
            .unwrap();
        let before = fingerprint(&market);

        let err = market.purchase(buyer, item, quantity, today()).unwrap_err();

        assert_eq!(err.category(), expected);
        assert_eq!(fingerprint(&market), before);
    }

    /// Restored store where only `funded` principals have ledger accounts
    fn restored_without_accounts(funded: &[&str]) -> Marketplace {
        let mut market = market();
        for id in funded {
            let account = Account::restore(id, id, Decimal::ZERO, Vec::new()).unwrap();
            market.restore_account(account).unwrap();
        }
        market
            .restore_item(Item::new("I1", "Sword", dec(50), 10))
            .unwrap();
        market.restore_buyer(Buyer::new("B1", "bob", "pw")).unwrap();
        let mut seller = Seller::new("S1", "sue", "pw");
        seller.items.push("I1".to_string());
        market.restore_seller(seller).unwrap();
        market.catalog.assign_owner("I1", "S1").unwrap();
        market
    }

    #[test]
    fn test_purchase_without_buyer_account_changes_nothing() {
        let mut market = restored_without_accounts(&["S1"]);
        let before = fingerprint(&market);

        let result = market.purchase("B1", "I1", 1, today());

        assert!(matches!(
            result,
            Err(MarketError::BuyerAccountMissing { ref buyer }) if buyer == "B1"
        ));
        assert_eq!(fingerprint(&market), before);
        assert_eq!(market.orders().count(), 0);
    }

    #[test]
    fn test_purchase_without_seller_account_changes_nothing() {
        let mut market = restored_without_accounts(&["B1"]);
        let before = fingerprint(&market);

        let result = market.purchase("B1", "I1", 1, today());

        assert!(matches!(
            result,
            Err(MarketError::SellerAccountMissing { ref seller }) if seller == "S1"
        ));
        assert_eq!(fingerprint(&market), before);
        assert_eq!(market.catalog().get("I1").unwrap().stock, 10);
    }

    #[test]
    fn test_purchase_exhausting_stock_and_funds() {
        let mut market = market_with_sword(500);

        market.purchase("B1", "I1", 10, today()).unwrap();
        assert_eq!(market.catalog().get("I1").unwrap().stock, 0);
        assert_eq!(market.ledger().balance("B1").unwrap(), Decimal::ZERO);

        market.replenish_item("S1", "I1", 1).unwrap();
        assert!(matches!(
            market.purchase("B1", "I1", 1, today()),
            Err(MarketError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn test_order_ids_are_unique() {
        let mut market = market_with_sword(10_000);
        let mut ids: Vec<OrderId> = (0..10)
            .map(|_| market.purchase("B1", "I1", 1, today()).unwrap())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn test_complete_order_lifecycle() {
        let mut market = market_with_sword(200);
        market.register_seller("S2", "sid", "pw").unwrap();
        let order_id = market.purchase("B1", "I1", 1, today()).unwrap();

        assert!(matches!(
            market.complete_order("S2", &order_id),
            Err(MarketError::NotOrderSeller { .. })
        ));
        assert!(matches!(
            market.complete_order("S1", "TX999999"),
            Err(MarketError::OrderNotFound { .. })
        ));

        market.complete_order("S1", &order_id).unwrap();
        assert_eq!(market.order(&order_id).unwrap().status, OrderStatus::Completed);
        assert!(market.list_paid_orders().is_empty());

        assert!(matches!(
            market.complete_order("S1", &order_id),
            Err(MarketError::InvalidStatusTransition { .. })
        ));
    }

    #[test]
    fn test_reports() {
        let mut market = market_with_sword(10_000);
        market.register_buyer("B2", "bea", "pw").unwrap();
        market.add_item("S1", "I2", "Shield", dec(30), 5).unwrap();
        market
            .ledger_mut()
            .deposit("B2", dec(1_000), today(), "topup")
            .unwrap();

        let old_day = today() - chrono::Duration::days(10);
        market.purchase("B1", "I1", 2, old_day).unwrap();
        market.purchase("B2", "I2", 1, today()).unwrap();
        market.purchase("B2", "I1", 1, today()).unwrap();
        market.purchase("B1", "I2", 1, today()).unwrap();

        assert_eq!(market.list_orders_within_last_days(7).len(), 3);
        assert_eq!(market.list_orders_within_last_days(10).len(), 4);
        assert_eq!(market.list_paid_orders().len(), 4);

        assert_eq!(
            market.most_sold_items(5),
            vec![("Sword".to_string(), 3), ("Shield".to_string(), 2)]
        );
        assert_eq!(
            market.most_active_buyers_today(5),
            vec![("B2".to_string(), 2), ("B1".to_string(), 1)]
        );
        assert_eq!(
            market.most_active_sellers_today(1),
            vec![("S1".to_string(), 3)]
        );

        assert_eq!(
            market.buyer_spending_within_last_days("B1", 7).unwrap(),
            dec(30)
        );
        assert_eq!(
            market.buyer_spending_within_last_days("B1", 30).unwrap(),
            dec(130)
        );

        let names: Vec<&str> = market
            .items_for_seller("S1")
            .unwrap()
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(names, vec!["Sword", "Shield"]);
        assert_eq!(market.orders_for_buyer("B2").unwrap().len(), 2);
    }

    #[test]
    fn test_most_sold_ties_follow_item_id_order() {
        let mut market = market();
        market.register_seller("S1", "sue", "pw").unwrap();
        market.add_item("S1", "I3", "Cap", dec(1), 1).unwrap();
        market.add_item("S1", "I1", "Axe", dec(1), 1).unwrap();
        market.add_item("S1", "I2", "Bow", dec(1), 1).unwrap();

        assert_eq!(
            market.most_sold_items(2),
            vec![("Axe".to_string(), 0), ("Bow".to_string(), 0)]
        );
    }

    #[test]
    fn test_seed_demo() {
        let mut market = market();
        market.seed_demo().unwrap();

        assert_eq!(market.ledger().balance("B1").unwrap(), dec(200));
        assert_eq!(market.catalog().len(), 2);
        assert_eq!(
            market.login("alice_seller", "123").unwrap(),
            Principal::Seller("S1".to_string())
        );

        let before = fingerprint(&market);
        assert!(matches!(
            market.seed_demo(),
            Err(MarketError::AlreadyExists { .. })
        ));
        assert_eq!(fingerprint(&market), before);
    }
}
