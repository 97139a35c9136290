//! Request replay driver
//!
//! This module feeds point requests from a CSV file through a
//! [`PointService`] and reports the resulting balances and history.
//!
//! # Architecture
//!
//! ```text
//! process()
//!     ├── EngineConfig (batch_size, worker_threads, limits, latency)
//!     ├── AsyncReader  (batch CSV reading)
//!     └── Replayer
//!         └── PointService
//!             ├── MemoryBalanceStore
//!             ├── MemoryHistoryStore
//!             └── KeyedSequencer (per-user ordering)
//! ```
//!
//! # Concurrency
//!
//! Every request of a batch is submitted before any of them is awaited, so
//! requests for different users run in parallel across the runtime's
//! worker threads while requests for one user run in file order. Batches
//! are awaited one after another to bound the amount of queued work.

pub mod config;

pub use config::EngineConfig;

use crate::core::{MemoryBalanceStore, MemoryHistoryStore, PendingResult, PointService};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::{write_balances_csv, write_history_csv};
use crate::types::{
    Balance, ErrorCategory, PointError, PointRequest, TransactionKind, TransactionRecord, UserId,
};
use futures::io::AsyncRead;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of replaying a single request
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOutcome {
    /// The request that was submitted
    pub request: PointRequest,

    /// The balance after the request, or why it was rejected
    pub result: Result<Balance, PointError>,
}

/// Summary of a replay run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayReport {
    /// Requests that committed
    pub committed: usize,

    /// Requests that were rejected or failed, malformed rows included
    pub rejected: usize,

    /// Rows that could not be parsed into a request
    pub malformed: usize,

    /// Final balance of every valid user that appeared in the input
    pub balances: Vec<Balance>,

    /// History of those users, in sequence order
    pub history: Vec<TransactionRecord>,
}

/// Submits requests to a [`PointService`]
#[derive(Debug, Clone)]
pub struct Replayer {
    service: PointService,
}

impl Replayer {
    /// Create a Replayer over an existing service
    pub fn new(service: PointService) -> Self {
        Self { service }
    }

    /// Create a Replayer over fresh in-memory stores
    pub fn in_memory(config: &EngineConfig) -> Self {
        let balances = Arc::new(MemoryBalanceStore::with_latency(config.store_latency));
        let history = Arc::new(MemoryHistoryStore::with_latency(config.store_latency));
        Self::new(PointService::with_config(
            balances,
            history,
            config.service_config(),
        ))
    }

    /// Submit one request
    pub fn submit(&self, request: &PointRequest) -> PendingResult<Balance> {
        match request.kind {
            TransactionKind::Charge => self.service.charge(request.user, request.amount),
            TransactionKind::Use => self.service.use_points(request.user, request.amount),
        }
    }

    /// Submit every request of a batch, then wait for all of them
    ///
    /// # Returns
    ///
    /// One outcome per request, in the order of `batch`.
    pub async fn replay_batch(&self, batch: Vec<PointRequest>) -> Vec<ReplayOutcome> {
        let pending: Vec<_> = batch
            .into_iter()
            .map(|request| {
                let result = self.submit(&request);
                async move {
                    ReplayOutcome {
                        request,
                        result: result.await,
                    }
                }
            })
            .collect();

        futures::future::join_all(pending).await
    }

    /// Replay every request produced by `reader`
    ///
    /// # Returns
    ///
    /// * `Ok(ReplayReport)` - Counts plus final balances and history
    /// * `Err(String)` - If final balances or history could not be read
    pub async fn replay<R>(
        &self,
        reader: &mut AsyncReader<R>,
        batch_size: usize,
    ) -> Result<ReplayReport, String>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let mut report = ReplayReport::default();
        let mut users = BTreeSet::new();

        loop {
            let batch = reader.read_batch(batch_size).await;
            if batch.is_empty() {
                break;
            }

            for outcome in self.replay_batch(batch).await {
                if outcome.request.user > 0 {
                    users.insert(outcome.request.user);
                }
                match &outcome.result {
                    Ok(_) => report.committed += 1,
                    Err(err) => {
                        report.rejected += 1;
                        log_rejection(&outcome.request, err);
                    }
                }
            }
        }

        report.malformed = reader.malformed();
        report.rejected += report.malformed;

        for user in users {
            report.balances.push(self.read_balance(user).await?);
            report.history.extend(self.read_history(user).await?);
        }
        report.history.sort_by_key(|record| record.sequence_id);

        info!(
            committed = report.committed,
            rejected = report.rejected,
            malformed = report.malformed,
            users = report.balances.len(),
            "replay finished"
        );
        Ok(report)
    }

    async fn read_balance(&self, user: UserId) -> Result<Balance, String> {
        self.service
            .get_balance(user)
            .await
            .map_err(|e| format!("Failed to read balance of user {}: {}", user, e))
    }

    async fn read_history(&self, user: UserId) -> Result<Vec<TransactionRecord>, String> {
        self.service
            .get_history(user)
            .await
            .map_err(|e| format!("Failed to read history of user {}: {}", user, e))
    }
}

fn log_rejection(request: &PointRequest, err: &PointError) {
    match err.category() {
        ErrorCategory::Client => warn!(
            user = request.user,
            kind = %request.kind,
            amount = request.amount,
            error = %err,
            "request rejected"
        ),
        ErrorCategory::Server => error!(
            user = request.user,
            kind = %request.kind,
            amount = request.amount,
            error = %err,
            "request failed"
        ),
    }
}

/// Replay a CSV file of requests and write the final balances
///
/// Builds a multi-threaded Tokio runtime with `config.worker_threads`
/// workers, replays `input_path` against fresh in-memory stores, writes
/// balances to `output` and, if given, the history to `history_output`.
///
/// # Returns
///
/// * `Ok(ReplayReport)` - If the run completed (individual rejections included)
/// * `Err(String)` - If the runtime, input file or output failed
pub fn process(
    config: &EngineConfig,
    input_path: &Path,
    output: &mut dyn Write,
    history_output: Option<&mut dyn Write>,
) -> Result<ReplayReport, String> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .enable_time()
        .build()
        .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

    let report = runtime.block_on(async {
        let file = tokio::fs::File::open(input_path)
            .await
            .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

        // Wrap tokio file in a compatibility layer for csv-async
        let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
        let mut reader = AsyncReader::new(compat_file);

        Replayer::in_memory(config)
            .replay(&mut reader, config.batch_size)
            .await
    })?;

    write_balances_csv(&report.balances, output)?;
    if let Some(history_output) = history_output {
        write_history_csv(&report.history, history_output)?;
    }

    Ok(report)
}
