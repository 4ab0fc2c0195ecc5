//! Ledger account types
//!
//! An [`Account`] is a balance plus an append-only history of signed
//! [`LedgerEntry`] values. The balance is always the running sum of the
//! entry amounts; entries are never edited or removed once posted.

use super::error::MarketError;
use super::identifier::AccountId;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// One signed movement of funds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Calendar day of the movement
    pub date: NaiveDate,
    /// Positive for deposits, negative for withdrawals
    pub amount: Decimal,
    /// Free-text note (e.g. "topup", "purchase I1")
    pub note: String,
}

/// Bank-style account owned by one principal
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Stable account identifier
    pub id: AccountId,

    /// Display name of the owner
    pub owner: String,

    balance: Decimal,
    entries: Vec<LedgerEntry>,
}

impl Account {
    /// Create an account with a zero balance and no history
    pub fn new(id: &str, owner: &str) -> Self {
        Account {
            id: id.to_string(),
            owner: owner.to_string(),
            balance: Decimal::ZERO,
            entries: Vec::new(),
        }
    }

    /// Rebuild an account from persisted parts
    ///
    /// # Errors
    ///
    /// Returns `MarketError::DataIntegrity` when `balance` is not the sum of
    /// the entry amounts, or `ArithmeticOverflow` if the sum cannot be formed.
    pub fn restore(
        id: &str,
        owner: &str,
        balance: Decimal,
        entries: Vec<LedgerEntry>,
    ) -> Result<Self, MarketError> {
        let sum = entries.iter().try_fold(Decimal::ZERO, |acc, entry| {
            acc.checked_add(entry.amount)
                .ok_or_else(|| MarketError::arithmetic_overflow("restore", id))
        })?;

        if sum != balance {
            return Err(MarketError::data_integrity(format!(
                "account {} balance {} does not match entry total {}",
                id, balance, sum
            )));
        }

        Ok(Account {
            id: id.to_string(),
            owner: owner.to_string(),
            balance,
            entries,
        })
    }

    /// Current balance
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Full history in posting order
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Date of the most recent entry, if any
    pub fn last_entry_date(&self) -> Option<NaiveDate> {
        self.entries.last().map(|entry| entry.date)
    }

    /// "owner (id)" label used by the reporting queries
    pub fn label(&self) -> String {
        format!("{} ({})", self.owner, self.id)
    }

    /// Append a signed entry and move the balance by the same amount
    ///
    /// This is the only way the balance changes, which keeps the balance equal
    /// to the sum of the entries.
    pub(crate) fn post(
        &mut self,
        date: NaiveDate,
        amount: Decimal,
        note: &str,
    ) -> Result<(), MarketError> {
        let new_balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| MarketError::arithmetic_overflow("post", &self.id))?;

        self.balance = new_balance;
        self.entries.push(LedgerEntry {
            date,
            amount,
            note: note.to_string(),
        });

        Ok(())
    }
}
