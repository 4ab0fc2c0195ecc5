//! I/O module
//!
//! Handles snapshot persistence.
//!
//! # Components
//!
//! - `flat_format` - Record shapes and the quote-aware one-line-per-record encoding
//! - `snapshot` - Saving and loading the full marketplace state to a directory

pub mod flat_format;
pub mod snapshot;

pub use snapshot::{exists as snapshot_exists, load as load_snapshot, save as save_snapshot};
