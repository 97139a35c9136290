//! In-memory balance storage
//!
//! This module provides the `MemoryBalanceStore` struct, a thread-safe
//! [`BalanceStore`] backed by `DashMap`.
//!
//! # Design
//!
//! Each operation touches exactly one map entry, so reads and writes for a
//! single user are atomic and operations on different users never contend
//! on the same shard lock for long. The store does not order operations;
//! that is the job of the sequencer in front of it.
//!
//! An optional fixed latency is applied before every operation to model a
//! slow backend when exercising the concurrency behavior.

use super::traits::BalanceStore;
use crate::types::{now_millis, Balance, Point, StoreError, UserId};
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;

/// Thread-safe in-memory balance table
///
/// Unknown users read as a zero balance without being inserted; a row is
/// created by the first write.
#[derive(Debug, Default)]
pub struct MemoryBalanceStore {
    /// Current balance per user
    ///
    /// DashMap shards its locking so different users proceed in parallel.
    balances: DashMap<UserId, Balance>,

    /// Delay applied before each operation
    latency: Duration,
}

impl MemoryBalanceStore {
    /// Create an empty store with no simulated latency
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that sleeps for `latency` before each operation
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            balances: DashMap::new(),
            latency,
        }
    }

    /// Number of users with a stored row
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    /// Whether no user has been written yet
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl BalanceStore for MemoryBalanceStore {
    async fn read(&self, id: UserId) -> Result<Balance, StoreError> {
        self.pause().await;
        Ok(self
            .balances
            .get(&id)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| Balance::empty(id)))
    }

    async fn write(&self, id: UserId, amount: Point) -> Result<(), StoreError> {
        self.pause().await;
        self.balances.insert(
            id,
            Balance {
                id,
                amount,
                updated_at_millis: now_millis(),
            },
        );
        Ok(())
    }
}
