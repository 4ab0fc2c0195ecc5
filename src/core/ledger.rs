//! Ledger (bank) module
//!
//! This module provides the `Ledger` struct which maintains every ledger
//! account and is the only component allowed to move money.
//!
//! The Ledger is responsible for:
//! - Opening accounts (optionally with a seed balance)
//! - Deposits and withdrawals with balance-sufficiency enforcement
//! - Double-entry transfers used to settle purchases
//! - Day-windowed and dormancy queries over the combined history

use crate::core::clock::{days_between, SharedClock};
use crate::core::ranking::top_n;
use crate::types::{validate_identifier, Account, AccountId, MarketError};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Note attached to the seed entry of a pre-funded account
pub const INITIAL_NOTE: &str = "initial";

/// Holds all ledger accounts keyed by identifier
///
/// Accounts are kept in a `BTreeMap`, so every listing and every ranking
/// tie-break follows identifier order.
pub struct Ledger {
    accounts: BTreeMap<AccountId, Account>,
    clock: SharedClock,
}

impl Ledger {
    /// Create an empty ledger that reads "today" from `clock`
    pub fn new(clock: SharedClock) -> Self {
        Ledger {
            accounts: BTreeMap::new(),
            clock,
        }
    }

    /// Current calendar day according to the ledger's clock
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Open a new account
    ///
    /// A positive `initial` balance is recorded as one entry dated today with
    /// the note "initial". A zero balance records nothing.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the identifier is malformed or `initial` is negative
    /// - `AlreadyExists` if an account with this identifier is already open
    pub fn open_account(
        &mut self,
        id: &str,
        owner: &str,
        initial: Decimal,
    ) -> Result<(), MarketError> {
        validate_identifier("account", id)?;

        if initial.is_sign_negative() && !initial.is_zero() {
            return Err(MarketError::invalid_input(format!(
                "initial balance {} for account {} is negative",
                initial, id
            )));
        }

        if self.accounts.contains_key(id) {
            return Err(MarketError::already_exists("account", id));
        }

        let mut account = Account::new(id, owner);
        if initial > Decimal::ZERO {
            account.post(self.today(), initial, INITIAL_NOTE)?;
        }

        debug!(account = id, owner, %initial, "opened ledger account");
        self.accounts.insert(id.to_string(), account);
        Ok(())
    }

    /// Look up an account
    pub fn get(&self, id: &str) -> Option<&Account> {
        self.accounts.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.accounts.contains_key(id)
    }

    /// Current balance of an account
    pub fn balance(&self, id: &str) -> Result<Decimal, MarketError> {
        self.accounts
            .get(id)
            .map(Account::balance)
            .ok_or_else(|| MarketError::account_not_found(id))
    }

    /// All accounts in identifier order
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Credit an account
    ///
    /// The amount is posted as-is. A negative amount therefore acts as a
    /// withdrawal without the sufficiency check; callers pass non-negative
    /// amounts.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if the account does not exist
    /// - `ArithmeticOverflow` if the balance would overflow
    pub fn deposit(
        &mut self,
        id: &str,
        amount: Decimal,
        date: NaiveDate,
        note: &str,
    ) -> Result<(), MarketError> {
        let account = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| MarketError::account_not_found(id))?;

        account.post(date, amount, note)?;
        debug!(account = id, %amount, %date, note, "deposit posted");
        Ok(())
    }

    /// Debit an account
    ///
    /// Appends a negative entry of `amount`. Nothing changes when the amount
    /// exceeds the current balance.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if the account does not exist
    /// - `InsufficientFunds` if `amount` is larger than the balance
    pub fn withdraw(
        &mut self,
        id: &str,
        amount: Decimal,
        date: NaiveDate,
        note: &str,
    ) -> Result<(), MarketError> {
        let account = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| MarketError::account_not_found(id))?;

        if amount > account.balance() {
            warn!(account = id, balance = %account.balance(), %amount, "withdrawal rejected");
            return Err(MarketError::insufficient_funds(id, account.balance(), amount));
        }

        account.post(date, -amount, note)?;
        debug!(account = id, %amount, %date, note, "withdrawal posted");
        Ok(())
    }

    /// Check that a transfer of `amount` from `from` to `to` would succeed
    ///
    /// Performs no mutation. [`Ledger::transfer`] runs the same checks before
    /// posting anything.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if either account is missing
    /// - `InsufficientFunds` if `from` cannot cover `amount`
    /// - `ArithmeticOverflow` if crediting `to` would overflow
    pub fn check_transfer(&self, from: &str, to: &str, amount: Decimal) -> Result<(), MarketError> {
        let debit = self
            .accounts
            .get(from)
            .ok_or_else(|| MarketError::account_not_found(from))?;
        let credit = self
            .accounts
            .get(to)
            .ok_or_else(|| MarketError::account_not_found(to))?;

        if amount > debit.balance() {
            return Err(MarketError::insufficient_funds(from, debit.balance(), amount));
        }

        // A self-transfer is debited before it is credited, so it cannot overflow
        if from != to {
            credit
                .balance()
                .checked_add(amount)
                .ok_or_else(|| MarketError::arithmetic_overflow("transfer", to))?;
        }

        Ok(())
    }

    /// Move `amount` from one account to another as a single unit
    ///
    /// Both entries are posted or neither is: every failure condition is
    /// checked before the debit is written.
    ///
    /// # Errors
    ///
    /// Same as [`Ledger::check_transfer`].
    pub fn transfer(
        &mut self,
        from: &str,
        to: &str,
        amount: Decimal,
        date: NaiveDate,
        debit_note: &str,
        credit_note: &str,
    ) -> Result<(), MarketError> {
        self.check_transfer(from, to, amount)?;

        // Both accounts exist and both postings fit; neither step can fail now
        self.withdraw(from, amount, date, debit_note)?;
        self.deposit(to, amount, date, credit_note)?;
        Ok(())
    }

    /// Accounts with no entries, or whose latest entry is more than
    /// `threshold_days` before today
    ///
    /// An account whose latest entry is exactly `threshold_days` old is not
    /// dormant. Labels are "owner (id)" in identifier order.
    pub fn accounts_without_recent_activity(&self, threshold_days: u32) -> Vec<String> {
        let today = self.today();

        self.accounts
            .values()
            .filter(|account| match account.last_entry_date() {
                None => true,
                Some(last) => days_between(today, last) > i64::from(threshold_days),
            })
            .map(Account::label)
            .collect()
    }

    /// Entries dated at most `window_days` before today
    ///
    /// Each row is labelled "date | owner" and the rows are sorted by that
    /// label in descending lexicographic order (not a chronological sort:
    /// owners on the same day are ordered by name, descending).
    pub fn entries_within_last_days(&self, window_days: u32) -> Vec<(String, Decimal)> {
        let today = self.today();

        let mut rows: Vec<(String, Decimal)> = self
            .accounts
            .values()
            .flat_map(|account| {
                account
                    .entries()
                    .iter()
                    .filter(move |entry| days_between(today, entry.date) <= i64::from(window_days))
                    .map(move |entry| (format!("{} | {}", entry.date, account.owner), entry.amount))
            })
            .collect();

        rows.sort_by(|a, b| b.0.cmp(&a.0));
        rows
    }

    /// Accounts ranked by the number of entries dated today
    ///
    /// Accounts with no entries today are left out. Ties keep identifier
    /// order; the result is truncated to `n`.
    pub fn top_active_accounts_today(&self, n: usize) -> Vec<(String, usize)> {
        let today = self.today();

        let counts = self.accounts.values().filter_map(|account| {
            let count = account
                .entries()
                .iter()
                .filter(|entry| entry.date == today)
                .count();
            (count > 0).then(|| (account.label(), count))
        });

        top_n(counts, n)
    }

    /// "owner (id)" label of every account in identifier order
    pub fn list_customers(&self) -> Vec<String> {
        self.accounts.values().map(Account::label).collect()
    }

    /// Insert an account rebuilt from a snapshot
    pub(crate) fn insert_restored(&mut self, account: Account) -> Result<(), MarketError> {
        if self.accounts.contains_key(&account.id) {
            return Err(MarketError::already_exists("account", &account.id));
        }
        self.accounts.insert(account.id.clone(), account);
        Ok(())
    }
}
