//! Key-scoped sequential execution
//!
//! This module provides `KeyedSequencer`, which runs asynchronous units of
//! work one-at-a-time per key, in submission order, while units for
//! different keys run concurrently.
//!
//! # Design
//!
//! The sequencer keeps one chain per key. The map stores only the tail of
//! each chain: a receiver that completes when the most recently submitted
//! unit for that key settles. Submitting swaps a fresh tail into the map
//! (a single `DashMap::insert`, which holds the shard lock for the swap)
//! and hands the previous tail to the new unit, which waits on it before
//! running.
//!
//! ```text
//! submit(k, u1)   tails[k] = rx1            u1 runs now
//! submit(k, u2)   tails[k] = rx2, waits rx1  u2 runs after u1 settles
//! submit(k, u3)   tails[k] = rx3, waits rx2  u3 runs after u2 settles
//! ```
//!
//! A settled unit removes its key from the map if it is still the tail, so
//! the map only holds keys with work in flight.
//!
//! # Failure
//!
//! Every unit settles its link when it finishes, fails or panics, so one
//! unit's outcome never blocks the units queued behind it. Units are
//! spawned onto the Tokio runtime and run to completion even if the caller
//! drops the returned future.

use dashmap::DashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::trace;

/// Tail of a key's chain
#[derive(Debug)]
struct Link {
    /// Identifies the unit that owns this link
    ticket: u64,

    /// Completes (or closes) when that unit settles
    settled: oneshot::Receiver<()>,
}

#[derive(Debug)]
struct Chains<K>
where
    K: Eq + Hash,
{
    tails: DashMap<K, Link>,
    next_ticket: AtomicU64,
}

/// Settles a unit's link when dropped
///
/// Dropping on completion and on panic alike keeps the chain moving.
struct Settle<K>
where
    K: Eq + Hash + Debug,
{
    chains: Arc<Chains<K>>,
    key: K,
    ticket: u64,
    done: Option<oneshot::Sender<()>>,
}

impl<K> Drop for Settle<K>
where
    K: Eq + Hash + Debug,
{
    fn drop(&mut self) {
        let ticket = self.ticket;
        if self
            .chains
            .tails
            .remove_if(&self.key, |_, link| link.ticket == ticket)
            .is_some()
        {
            trace!(key = ?self.key, ticket, "chain drained, evicted key");
        }
        if let Some(done) = self.done.take() {
            // Nobody queued behind this unit if the receiver is gone.
            let _ = done.send(());
        }
    }
}

/// Runs units of work sequentially per key and concurrently across keys
///
/// `KeyedSequencer` is a cheap handle; clones share the same chains.
///
/// # Guarantees
///
/// - Units submitted for the same key run one at a time, in the order
///   `submit` was called
/// - A unit's failure or panic is reported only to its own caller
/// - Units for different keys have no ordering relationship
#[derive(Debug)]
pub struct KeyedSequencer<K>
where
    K: Eq + Hash,
{
    chains: Arc<Chains<K>>,
}

impl<K> KeyedSequencer<K>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
{
    /// Create a sequencer with no chains
    pub fn new() -> Self {
        Self {
            chains: Arc::new(Chains {
                tails: DashMap::new(),
                next_ticket: AtomicU64::new(0),
            }),
        }
    }

    /// Queue a unit of work behind every unit previously submitted for `key`
    ///
    /// Linking happens before this method returns, so the call order of
    /// `submit` is the execution order for a key. The unit itself is spawned
    /// onto the current Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `key` - Chain the unit belongs to
    /// * `unit` - Produces the future to run once the previous unit settles
    ///
    /// # Returns
    ///
    /// A future resolving to the unit's output. Dropping it does not cancel
    /// the unit.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime. If the unit panics, awaiting
    /// the returned future resumes that panic in the caller. If the runtime
    /// shuts down before the unit completes, the unit is cancelled and
    /// awaiting the returned future panics with "sequenced unit did not
    /// complete".
    pub fn submit<F, Fut>(
        &self,
        key: K,
        unit: F,
    ) -> impl Future<Output = Fut::Output> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let ticket = self.chains.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (done, settled) = oneshot::channel();

        // The swap is the critical section: two submitters for one key can
        // never both observe the same previous tail.
        let previous = self.chains.tails.insert(key.clone(), Link { ticket, settled });
        trace!(key = ?key, ticket, queued = previous.is_some(), "linked unit");

        let settle = Settle {
            chains: Arc::clone(&self.chains),
            key,
            ticket,
            done: Some(done),
        };

        let handle = tokio::spawn(async move {
            let _settle = settle;
            if let Some(previous) = previous {
                // A closed channel also means the previous unit settled.
                let _ = previous.settled.await;
            }
            unit().await
        });

        async move {
            match handle.await {
                Ok(output) => output,
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(err) => panic!("sequenced unit did not complete: {}", err),
            }
        }
    }

    /// Number of keys that currently have a unit queued or running
    pub fn pending_keys(&self) -> usize {
        self.chains.tails.len()
    }
}

impl<K> Clone for KeyedSequencer<K>
where
    K: Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            chains: Arc::clone(&self.chains),
        }
    }
}

impl<K> Default for KeyedSequencer<K>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
