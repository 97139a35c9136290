//! Point balance service
//!
//! This module provides `PointService`, which layers the business rules of
//! charging and using points on top of a sequenced read-modify-write of a
//! user's balance.
//!
//! # Design
//!
//! ```text
//! PointService
//!     ├── Arc<dyn BalanceStore>      (current balances)
//!     ├── Arc<dyn HistoryStore>      (append-only ledger)
//!     └── KeyedSequencer<UserId>     (one mutation in flight per user)
//! ```
//!
//! Every operation validates its arguments first and fails immediately on
//! bad input, without touching the sequencer. Charges and uses are then
//! submitted to the sequencer keyed by user id, so the read, the rule check
//! and the writes of one mutation never interleave with another mutation
//! for the same user.
//!
//! # Consistency
//!
//! With [`ReadConsistency::Relaxed`] (the default) balance and history reads
//! bypass the sequencer and may observe a user either before or after a
//! concurrent mutation commits. [`ReadConsistency::Sequenced`] queues reads
//! behind pending mutations instead.
//!
//! # Partial failure
//!
//! A mutation writes the balance first and appends history second. If the
//! append fails, the unit writes the previous balance back before
//! reporting `StorageFault`. If that restore fails too, the stores disagree
//! and the unit reports `SystemFailure`.

use super::sequencer::KeyedSequencer;
use super::traits::{BalanceStore, HistoryStore};
use crate::types::{
    now_millis, Balance, Point, PointError, StoreError, TransactionKind, TransactionRecord,
    UserId, MAX_HOLDING,
};
use futures::future::{self, BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Result of an operation that has already been submitted
///
/// The work is linked into its user's chain when the operation is called,
/// not when this future is first polled.
pub type PendingResult<T> = BoxFuture<'static, Result<T, PointError>>;

/// How balance and history reads are ordered against mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadConsistency {
    /// Reads go straight to the stores
    #[default]
    Relaxed,
    /// Reads queue behind pending mutations for the same user
    Sequenced,
}

/// Business-rule configuration of a [`PointService`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Largest balance a user may hold, and largest single charge
    pub max_holding: Point,
    /// Ordering of reads against mutations
    pub read_consistency: ReadConsistency,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_holding: MAX_HOLDING,
            read_consistency: ReadConsistency::Relaxed,
        }
    }
}

/// Check a user id
///
/// # Returns
///
/// * `Ok(())` - If `id` is positive
/// * `Err(PointError::InvalidKey)` - Otherwise
pub fn validate_user_id(id: UserId) -> Result<(), PointError> {
    if id > 0 {
        Ok(())
    } else {
        Err(PointError::invalid_key(id))
    }
}

/// Check a user id and amount together
///
/// | id valid | amount valid | result             |
/// |----------|--------------|--------------------|
/// | no       | no           | `InvalidArguments` |
/// | no       | yes          | `InvalidKey`       |
/// | yes      | no           | `InvalidAmount`    |
/// | yes      | yes          | `Ok(())`           |
pub fn validate_request(id: UserId, amount: Point) -> Result<(), PointError> {
    match (id > 0, amount > 0) {
        (false, false) => Err(PointError::invalid_arguments(id, amount)),
        (false, true) => Err(PointError::invalid_key(id)),
        (true, false) => Err(PointError::invalid_amount(amount)),
        (true, true) => Ok(()),
    }
}

/// Balance transaction service
///
/// Cheap to clone; clones share stores and sequencer.
#[derive(Debug, Clone)]
pub struct PointService {
    balances: Arc<dyn BalanceStore>,
    history: Arc<dyn HistoryStore>,
    sequencer: KeyedSequencer<UserId>,
    config: ServiceConfig,
}

impl PointService {
    /// Create a service with the default configuration
    pub fn new(balances: Arc<dyn BalanceStore>, history: Arc<dyn HistoryStore>) -> Self {
        Self::with_config(balances, history, ServiceConfig::default())
    }

    /// Create a service with a custom configuration
    pub fn with_config(
        balances: Arc<dyn BalanceStore>,
        history: Arc<dyn HistoryStore>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            balances,
            history,
            sequencer: KeyedSequencer::new(),
            config,
        }
    }

    /// Number of users with a mutation (or sequenced read) in flight
    pub fn pending_users(&self) -> usize {
        self.sequencer.pending_keys()
    }

    /// Read the current balance of a user
    ///
    /// # Returns
    ///
    /// * `Ok(Balance)` - Current balance (zero for an unknown user)
    /// * `Err(PointError::InvalidKey)` - If `id` is not positive
    /// * `Err(PointError::SystemFailure)` - If the store faults
    pub fn get_balance(&self, id: UserId) -> PendingResult<Balance> {
        if let Err(err) = validate_user_id(id) {
            return future::ready(Err(err)).boxed();
        }

        let balances = Arc::clone(&self.balances);
        self.route_read(id, async move {
            balances
                .read(id)
                .await
                .map_err(|err| PointError::system_failure("get_balance", err.message))
        })
    }

    /// Read every history record of a user in append order
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<TransactionRecord>)` - Possibly empty history
    /// * `Err(PointError::InvalidKey)` - If `id` is not positive
    /// * `Err(PointError::SystemFailure)` - If the store faults
    pub fn get_history(&self, id: UserId) -> PendingResult<Vec<TransactionRecord>> {
        if let Err(err) = validate_user_id(id) {
            return future::ready(Err(err)).boxed();
        }

        let history = Arc::clone(&self.history);
        self.route_read(id, async move {
            history
                .read_all(id)
                .await
                .map_err(|err| PointError::system_failure("get_history", err.message))
        })
    }

    /// Add points to a user's balance
    ///
    /// # Returns
    ///
    /// * `Ok(Balance)` - The balance after the charge
    /// * `Err(PointError::InvalidArguments | InvalidKey | InvalidAmount)` - Bad input
    /// * `Err(PointError::AmountLimitExceeded)` - If `amount` alone exceeds the limit
    /// * `Err(PointError::HoldingLimitExceeded)` - If the new balance would exceed the limit
    /// * `Err(PointError::StorageFault | SystemFailure)` - If a store faults
    pub fn charge(&self, id: UserId, amount: Point) -> PendingResult<Balance> {
        self.mutate(id, amount, TransactionKind::Charge)
    }

    /// Spend points from a user's balance
    ///
    /// # Returns
    ///
    /// * `Ok(Balance)` - The balance after the use
    /// * `Err(PointError::InvalidArguments | InvalidKey | InvalidAmount)` - Bad input
    /// * `Err(PointError::InsufficientFunds)` - If the balance does not cover `amount`
    /// * `Err(PointError::StorageFault | SystemFailure)` - If a store faults
    pub fn use_points(&self, id: UserId, amount: Point) -> PendingResult<Balance> {
        self.mutate(id, amount, TransactionKind::Use)
    }

    fn route_read<T, Fut>(&self, id: UserId, read: Fut) -> PendingResult<T>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, PointError>> + Send + 'static,
    {
        match self.config.read_consistency {
            ReadConsistency::Relaxed => read.boxed(),
            ReadConsistency::Sequenced => self.sequencer.submit(id, move || read).boxed(),
        }
    }

    fn mutate(&self, id: UserId, amount: Point, kind: TransactionKind) -> PendingResult<Balance> {
        if let Err(err) = validate_request(id, amount) {
            debug!(user = id, amount, %kind, error = %err, "rejected invalid request");
            return future::ready(Err(err)).boxed();
        }

        let service = self.clone();
        self.sequencer
            .submit(id, move || async move { service.apply(id, amount, kind).await })
            .boxed()
    }

    /// Body of a sequenced mutation: read, check, commit
    async fn apply(
        &self,
        id: UserId,
        amount: Point,
        kind: TransactionKind,
    ) -> Result<Balance, PointError> {
        let current = self
            .balances
            .read(id)
            .await
            .map_err(|err| PointError::storage_fault(kind.as_str(), &err))?;

        let next = match kind {
            TransactionKind::Charge => self.charged_amount(&current, amount),
            TransactionKind::Use => used_amount(&current, amount),
        }
        .inspect_err(|err| debug!(user = id, amount, %kind, error = %err, "rule rejected"))?;

        self.commit(&current, next, amount, kind).await
    }

    fn charged_amount(&self, current: &Balance, amount: Point) -> Result<Point, PointError> {
        let limit = self.config.max_holding;
        if amount > limit {
            return Err(PointError::amount_limit_exceeded(amount, limit));
        }

        current
            .amount
            .checked_add(amount)
            .filter(|next| *next <= limit)
            .ok_or_else(|| {
                PointError::holding_limit_exceeded(current.id, current.amount, amount, limit)
            })
    }

    async fn commit(
        &self,
        current: &Balance,
        next: Point,
        amount: Point,
        kind: TransactionKind,
    ) -> Result<Balance, PointError> {
        let id = current.id;
        let now = now_millis();

        self.balances
            .write(id, next)
            .await
            .map_err(|err| PointError::storage_fault(kind.as_str(), &err))?;

        match self.history.append(id, amount, kind, now).await {
            Ok(record) => {
                debug!(
                    user = id,
                    %kind,
                    amount,
                    balance = next,
                    sequence = record.sequence_id,
                    "committed"
                );
                Ok(Balance {
                    id,
                    amount: next,
                    updated_at_millis: now,
                })
            }
            Err(err) => Err(self.restore(current, kind, &err).await),
        }
    }

    /// Write back the pre-transaction balance after a failed history append
    async fn restore(
        &self,
        current: &Balance,
        kind: TransactionKind,
        cause: &StoreError,
    ) -> PointError {
        match self.balances.write(current.id, current.amount).await {
            Ok(()) => {
                warn!(
                    user = current.id,
                    %kind,
                    error = %cause,
                    "history append failed, balance restored"
                );
                PointError::storage_fault(kind.as_str(), cause)
            }
            Err(restore_err) => {
                error!(
                    user = current.id,
                    %kind,
                    expected = current.amount,
                    error = %cause,
                    restore_error = %restore_err,
                    "history append failed and balance restore failed, stores diverged"
                );
                PointError::system_failure(
                    kind.as_str(),
                    format!(
                        "history append failed ({}) and balance restore failed ({})",
                        cause.message, restore_err.message
                    ),
                )
            }
        }
    }
}

fn used_amount(current: &Balance, amount: Point) -> Result<Point, PointError> {
    if amount > current.amount {
        Err(PointError::insufficient_funds(current.id, current.amount, amount))
    } else {
        Ok(current.amount - amount)
    }
}
