//! In-memory transaction history
//!
//! This module provides the `MemoryHistoryStore` struct, an append-only
//! [`HistoryStore`] backed by `DashMap`.
//!
//! # Design
//!
//! Records are grouped per user. Sequence ids come from one store-wide
//! counter starting at 1 and are drawn while the user's entry is locked,
//! so within a user the sequence ids increase in append order.

use super::traits::HistoryStore;
use crate::types::{Point, StoreError, TransactionKind, TransactionRecord, UserId};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Thread-safe append-only history table
#[derive(Debug)]
pub struct MemoryHistoryStore {
    /// Records per user, in append order
    records: DashMap<UserId, Vec<TransactionRecord>>,

    /// Next sequence id to hand out
    next_sequence: AtomicU64,

    /// Delay applied before each operation
    latency: Duration,
}

impl MemoryHistoryStore {
    /// Create an empty history with no simulated latency
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    /// Create an empty history that sleeps for `latency` before each operation
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            records: DashMap::new(),
            next_sequence: AtomicU64::new(1),
            latency,
        }
    }

    /// Total number of records across all users
    pub fn len(&self) -> usize {
        self.records.iter().map(|entry| entry.value().len()).sum()
    }

    /// Whether nothing has been appended yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(
        &self,
        user_id: UserId,
        amount: Point,
        kind: TransactionKind,
        time_millis: u64,
    ) -> Result<TransactionRecord, StoreError> {
        self.pause().await;

        let mut entry = self.records.entry(user_id).or_default();
        let record = TransactionRecord {
            sequence_id: self.next_sequence.fetch_add(1, Ordering::SeqCst),
            user_id,
            amount,
            kind,
            time_millis,
        };
        entry.push(record.clone());
        Ok(record)
    }

    async fn read_all(&self, user_id: UserId) -> Result<Vec<TransactionRecord>, StoreError> {
        self.pause().await;
        Ok(self
            .records
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }
}
