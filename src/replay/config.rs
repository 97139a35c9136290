//! Engine configuration
//!
//! Collects everything the replay driver needs to build a runtime, stores
//! and service. Zero values fall back to defaults with a warning.

use crate::core::{ReadConsistency, ServiceConfig};
use crate::types::{Point, MAX_HOLDING};
use std::time::Duration;
use tracing::warn;

/// Configuration for a replay run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of requests read and submitted per batch
    pub batch_size: usize,
    /// Worker threads of the Tokio runtime
    pub worker_threads: usize,
    /// Holding limit enforced by the service
    pub max_holding: Point,
    /// Simulated latency of every store operation
    pub store_latency: Duration,
    /// Ordering of reads against mutations
    pub read_consistency: ReadConsistency,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            worker_threads: num_cpus::get(),
            max_holding: MAX_HOLDING,
            store_latency: Duration::ZERO,
            read_consistency: ReadConsistency::Relaxed,
        }
    }
}

impl EngineConfig {
    /// Create a new EngineConfig with custom sizing
    ///
    /// A zero `batch_size`, zero `worker_threads` or non-positive
    /// `max_holding` is replaced by its default.
    pub fn new(batch_size: usize, worker_threads: usize, max_holding: Point) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let worker_threads = if worker_threads == 0 {
            warn!(
                worker_threads,
                default = default.worker_threads,
                "invalid worker_threads, using default"
            );
            default.worker_threads
        } else {
            worker_threads
        };

        let max_holding = if max_holding <= 0 {
            warn!(
                max_holding,
                default = default.max_holding,
                "invalid max_holding, using default"
            );
            default.max_holding
        } else {
            max_holding
        };

        Self {
            batch_size,
            worker_threads,
            max_holding,
            ..default
        }
    }

    /// Set the simulated store latency
    pub fn with_store_latency(mut self, latency: Duration) -> Self {
        self.store_latency = latency;
        self
    }

    /// Set the read consistency level
    pub fn with_read_consistency(mut self, read_consistency: ReadConsistency) -> Self {
        self.read_consistency = read_consistency;
        self
    }

    /// The business-rule part of this configuration
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            max_holding: self.max_holding,
            read_consistency: self.read_consistency,
        }
    }
}
