//! Core business logic module
//!
//! This module contains the marketplace components:
//! - `clock` - Injectable "today" source and day arithmetic
//! - `ledger` - Bank accounts, entries, transfers, and ledger reports
//! - `catalog` - Items and the item → seller owner index
//! - `ids` - Order identifier generation
//! - `ranking` - Top-N helper shared by the reports
//! - `marketplace` - Registration, login, purchases, and order reports

pub mod catalog;
pub mod clock;
pub mod ids;
pub mod ledger;
pub mod marketplace;
pub mod ranking;

pub use catalog::Catalog;
pub use clock::{system_clock, Clock, FixedClock, SharedClock, SystemClock};
pub use ids::OrderIdGenerator;
pub use ledger::Ledger;
pub use marketplace::Marketplace;
