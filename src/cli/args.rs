use crate::core::ReadConsistency;
use crate::replay::EngineConfig;
use crate::types::Point;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Replay point charge/use requests with per-user ordering
#[derive(Parser, Debug)]
#[command(name = "point-engine")]
#[command(about = "Replay point charge/use requests with per-user ordering", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing requests
    #[arg(value_name = "INPUT", help = "Path to the input CSV file (type,user,amount)")]
    pub input_file: PathBuf,

    /// Where to write the transaction history
    #[arg(
        long = "history",
        value_name = "PATH",
        help = "Also write the transaction history CSV to PATH"
    )]
    pub history_file: Option<PathBuf>,

    /// Number of requests per batch
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of requests submitted per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Number of runtime worker threads
    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Number of runtime worker threads (default: CPU cores)"
    )]
    pub workers: Option<usize>,

    /// Holding limit per user
    #[arg(
        long = "max-holding",
        value_name = "POINTS",
        help = "Largest balance a user may hold (default: 100000)"
    )]
    pub max_holding: Option<Point>,

    /// Simulated store latency
    #[arg(
        long = "store-latency-ms",
        value_name = "MILLIS",
        default_value_t = 0,
        help = "Delay applied to every store operation"
    )]
    pub store_latency_ms: u64,

    /// Route reads through the per-user queue
    #[arg(
        long = "sequenced-reads",
        help = "Order balance/history reads behind pending mutations"
    )]
    pub sequenced_reads: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(
        long = "log-level",
        value_name = "FILTER",
        default_value = "info",
        help = "Log filter used when RUST_LOG is not set"
    )]
    pub log_level: String,
}

impl CliArgs {
    /// Create an EngineConfig from CLI arguments
    ///
    /// Options that were not given keep their defaults; invalid values fall
    /// back to defaults with a warning (see [`EngineConfig::new`]).
    pub fn to_engine_config(&self) -> EngineConfig {
        let default = EngineConfig::default();
        let read_consistency = if self.sequenced_reads {
            ReadConsistency::Sequenced
        } else {
            ReadConsistency::Relaxed
        };

        EngineConfig::new(
            self.batch_size.unwrap_or(default.batch_size),
            self.workers.unwrap_or(default.worker_threads),
            self.max_holding.unwrap_or(default.max_holding),
        )
        .with_store_latency(Duration::from_millis(self.store_latency_ms))
        .with_read_consistency(read_consistency)
    }
}
