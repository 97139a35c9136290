//! Rust Point Engine CLI
//!
//! Command-line interface for replaying point charge/use requests from CSV
//! files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- requests.csv > balances.csv
//! cargo run -- --history history.csv requests.csv > balances.csv
//! cargo run -- --workers 8 --store-latency-ms 5 --sequenced-reads requests.csv
//! ```
//!
//! The program reads requests (`type,user,amount`) from the input CSV file,
//! submits them through the point service and writes the final balance of
//! every user to stdout. Logs go to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, file not readable, etc.)

use rust_point_engine::{cli, replay};
use std::fs::File;
use std::io::Write;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = cli::parse_args();

    // RUST_LOG wins over --log-level when set
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = args.to_engine_config();

    let mut history_file = match args.history_file.as_ref().map(File::create).transpose() {
        Ok(file) => file,
        Err(e) => {
            tracing::error!(error = %e, "failed to create history file");
            process::exit(1);
        }
    };

    let mut output = std::io::stdout();
    let history_output = history_file.as_mut().map(|file| file as &mut dyn Write);
    if let Err(e) = replay::process(&config, &args.input_file, &mut output, history_output) {
        tracing::error!(error = %e, "replay failed");
        process::exit(1);
    }
}
