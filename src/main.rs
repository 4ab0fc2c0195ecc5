//! Marketplace ledger CLI
//!
//! Runs one marketplace command against a snapshot directory.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- seed-demo
//! cargo run -- purchase B1 I1 3
//! cargo run -- orders B1
//! cargo run -- --data-dir /tmp/store most-sold --top 3
//! RUST_LOG=info cargo run -- top-up B1 25
//! ```
//!
//! Command output goes to stdout; logs go to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (unknown account or item, insufficient funds, unreadable snapshot, etc.)

use marketplace_ledger::{cli, core, telemetry};
use std::process;

fn main() {
    telemetry::init();

    let args = cli::parse_args();

    let mut output = std::io::stdout();
    if let Err(e) = cli::run(&args, core::system_clock(), &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
