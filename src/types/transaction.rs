//! Transaction-related types for the Rust Point Engine
//!
//! This module defines the kinds of balance mutation, the append-only
//! history record written for each committed mutation, and the request
//! shape the replay driver feeds into the service.

use super::balance::{Point, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kinds of balance mutation supported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Add points to a balance
    ///
    /// Rejected when the single amount or the resulting balance exceeds
    /// the holding limit.
    Charge,

    /// Spend points from a balance
    ///
    /// Rejected when the balance does not cover the amount.
    Use,
}

impl TransactionKind {
    /// Lowercase name, as used in CSV input/output and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Charge => "charge",
            TransactionKind::Use => "use",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "charge" => Ok(TransactionKind::Charge),
            "use" => Ok(TransactionKind::Use),
            other => Err(format!("Invalid transaction type: '{}'", other)),
        }
    }
}

/// Append-only history entry for one committed mutation
///
/// Records are created by a [`HistoryStore`](crate::core::HistoryStore) at
/// commit time and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Store-wide sequence number, starting at 1, in append order
    pub sequence_id: u64,

    /// The user whose balance was mutated
    pub user_id: UserId,

    /// The (positive) amount charged or used
    pub amount: Point,

    /// Whether this was a charge or a use
    pub kind: TransactionKind,

    /// Commit time in milliseconds since the UNIX epoch
    pub time_millis: u64,
}

/// A single charge/use request as read from input
///
/// Fields are unvalidated; the service decides whether the id and amount
/// are acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointRequest {
    /// Requested mutation
    pub kind: TransactionKind,

    /// Target user
    pub user: UserId,

    /// Requested amount
    pub amount: Point,
}
