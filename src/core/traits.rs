//! Core traits for balance and history storage
//!
//! These are the narrow interfaces the point service calls. Any backend
//! that provides atomic single-key reads and writes can implement them;
//! the in-memory implementations live in [`super::balance_store`] and
//! [`super::history_store`].

use crate::types::{Balance, Point, StoreError, TransactionKind, TransactionRecord, UserId};
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for reading and writing current balances
///
/// Implementations must make each call atomic for a single user. Ordering
/// across calls is the service's job, not the store's.
#[async_trait]
pub trait BalanceStore: Send + Sync + Debug {
    /// Read the current balance of a user
    ///
    /// A user that has never been written reads as [`Balance::empty`].
    async fn read(&self, id: UserId) -> Result<Balance, StoreError>;

    /// Overwrite the balance of a user
    async fn write(&self, id: UserId, amount: Point) -> Result<(), StoreError>;
}

/// Trait for the append-only transaction history
#[async_trait]
pub trait HistoryStore: Send + Sync + Debug {
    /// Append a record and return it with its assigned sequence id
    async fn append(
        &self,
        user_id: UserId,
        amount: Point,
        kind: TransactionKind,
        time_millis: u64,
    ) -> Result<TransactionRecord, StoreError>;

    /// Read every record of a user in append order
    async fn read_all(&self, user_id: UserId) -> Result<Vec<TransactionRecord>, StoreError>;
}
