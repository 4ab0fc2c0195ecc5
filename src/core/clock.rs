//! Calendar clock and day arithmetic
//!
//! Every "today" in the ledger and marketplace comes from a [`Clock`], so the
//! day-windowed queries can be driven deterministically in tests.

use chrono::{Local, NaiveDate};
use std::sync::Arc;

/// Date format used for every persisted and displayed calendar day
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of the current calendar day
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Clock shared between the ledger and the marketplace
pub type SharedClock = Arc<dyn Clock>;

/// Local wall-clock date
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to one day
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Convenience constructor for the system clock behind an `Arc`
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

/// Parse a `YYYY-MM-DD` day
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
}

/// Whole calendar days from `earlier` to `later` (negative if `later` is before)
pub fn days_between(later: NaiveDate, earlier: NaiveDate) -> i64 {
    (later - earlier).num_days()
}

/// [`days_between`] over `YYYY-MM-DD` text
///
/// If either date fails to parse the two are treated as the same day and the
/// result is 0.
pub fn days_between_str(later: &str, earlier: &str) -> i64 {
    match (parse_date(later), parse_date(earlier)) {
        (Some(later), Some(earlier)) => days_between(later, earlier),
        _ => 0,
    }
}
