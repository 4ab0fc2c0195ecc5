//! Runtime configuration
//!
//! `MarketConfig` collects the knobs the binary exposes: where snapshots
//! live, and the thresholds used by the reporting commands.

use crate::core::ids::DEFAULT_ORDER_PREFIX;
use crate::types::validate_identifier;
use std::path::PathBuf;
use tracing::warn;

/// Default snapshot directory
pub const DEFAULT_DATA_DIR: &str = "data_store";

/// Configuration for a marketplace session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarketConfig {
    /// Directory holding the snapshot files
    pub data_dir: PathBuf,
    /// Days without ledger activity before an account counts as dormant
    pub dormancy_days: u32,
    /// Look-back window for the "recent" reports
    pub window_days: u32,
    /// Number of rows kept by the ranking reports
    pub top: usize,
    /// Prefix of generated order ids
    pub order_prefix: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            dormancy_days: 30,
            window_days: 7,
            top: 5,
            order_prefix: DEFAULT_ORDER_PREFIX.to_string(),
        }
    }
}

impl MarketConfig {
    /// Create a MarketConfig with custom values
    ///
    /// A zero `window_days` or `top` would make every report empty, so both
    /// fall back to their defaults with a warning. A zero `dormancy_days` is
    /// kept: it flags every account without activity today. An order prefix
    /// that could not appear in a snapshot record falls back to `TX`.
    pub fn new(
        data_dir: PathBuf,
        dormancy_days: u32,
        window_days: u32,
        top: usize,
        order_prefix: &str,
    ) -> Self {
        let default = Self::default();

        let window_days = if window_days == 0 {
            warn!(
                "Invalid window_days ({}), using default ({})",
                window_days, default.window_days
            );
            default.window_days
        } else {
            window_days
        };

        let top = if top == 0 {
            warn!("Invalid top ({}), using default ({})", top, default.top);
            default.top
        } else {
            top
        };

        let order_prefix = match validate_identifier("order prefix", order_prefix) {
            Ok(()) => order_prefix.to_string(),
            Err(e) => {
                warn!("{}, using default ({})", e, default.order_prefix);
                default.order_prefix
            }
        };

        Self {
            data_dir,
            dormancy_days,
            window_days,
            top,
            order_prefix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::custom(3, 10, 3, 10)]
    #[case::zero_window(0, 10, 7, 10)]
    #[case::zero_top(3, 0, 3, 5)]
    fn test_new_falls_back_on_zero(
        #[case] window_days: u32,
        #[case] top: usize,
        #[case] expected_window: u32,
        #[case] expected_top: usize,
    ) {
        let config = MarketConfig::new(PathBuf::from("store"), 0, window_days, top, "TX");

        assert_eq!(config.window_days, expected_window);
        assert_eq!(config.top, expected_top);
        assert_eq!(config.dormancy_days, 0);
        assert_eq!(config.data_dir, PathBuf::from("store"));
        assert_eq!(config.order_prefix, "TX");
    }

    #[rstest]
    #[case::custom("ORD", "ORD")]
    #[case::empty("", "TX")]
    #[case::delimiter("A|B", "TX")]
    #[case::whitespace("O D", "TX")]
    fn test_new_checks_order_prefix(#[case] prefix: &str, #[case] expected: &str) {
        let config = MarketConfig::new(PathBuf::from("store"), 30, 7, 5, prefix);

        assert_eq!(config.order_prefix, expected);
    }
}
