//! Error types for the Rust Point Engine
//!
//! This module defines all error types that can occur while reading or
//! mutating point balances.
//!
//! # Error Categories
//!
//! - **Validation Errors**: Invalid user id, invalid amount, or both
//! - **Rule Errors**: Charge limit, holding limit, insufficient points
//! - **Storage Errors**: Faults reported by the balance/history stores
//! - **System Errors**: Unexpected failures, including diverged stores
//!
//! Validation and rule errors are the caller's fault; storage and system
//! errors are the server's. See [`ErrorCategory`].

use super::balance::{Point, UserId};
use thiserror::Error;

/// Main error type for the point engine
///
/// Each variant includes the context needed to explain the rejection.
/// Validation variants are produced before any work is queued; every
/// other variant is produced inside a sequenced unit and reported only to
/// that unit's caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointError {
    /// The user id is not a positive integer
    #[error("Invalid user id {id}")]
    InvalidKey {
        /// The rejected id
        id: UserId,
    },

    /// The amount is not a positive integer
    #[error("Amount must be greater than zero, got {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: Point,
    },

    /// Both the user id and the amount are invalid
    #[error("Invalid user id {id} and amount {amount}")]
    InvalidArguments {
        /// The rejected id
        id: UserId,
        /// The rejected amount
        amount: Point,
    },

    /// A single charge is larger than the holding limit
    #[error("Charge amount {amount} exceeds the limit of {limit}")]
    AmountLimitExceeded {
        /// Requested charge
        amount: Point,
        /// Holding limit in effect
        limit: Point,
    },

    /// The charge would push the balance above the holding limit
    #[error("Holding limit {limit} exceeded for user {id}: current {current}, charge {amount}")]
    HoldingLimitExceeded {
        /// User id
        id: UserId,
        /// Balance before the charge
        current: Point,
        /// Requested charge
        amount: Point,
        /// Holding limit in effect
        limit: Point,
    },

    /// The balance does not cover the requested use
    #[error("Insufficient points for user {id}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// User id
        id: UserId,
        /// Current balance
        available: Point,
        /// Requested use
        requested: Point,
    },

    /// A store reported a fault while a mutation was in progress
    ///
    /// No partial effect remains: either nothing was written, or the
    /// balance write was compensated.
    #[error("Storage fault during {operation}: {message}")]
    StorageFault {
        /// Operation that failed
        operation: String,
        /// Description reported by the store
        message: String,
    },

    /// Unexpected failure outside the normal rule/storage paths
    ///
    /// Also used when a compensating write fails and the balance and
    /// history stores may disagree.
    #[error("System failure during {operation}: {message}")]
    SystemFailure {
        /// Operation that failed
        operation: String,
        /// Description of the failure
        message: String,
    },
}

/// Who is responsible for an error
///
/// Lets an outer surface (HTTP, CLI) map errors without knowing every
/// variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Validation or business-rule rejection
    Client,
    /// Storage or system fault
    Server,
}

/// Fault reported by a balance or history store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("storage fault: {message}")]
pub struct StoreError {
    /// Description of the fault
    pub message: String,
}

impl StoreError {
    /// Create a StoreError with the given description
    pub fn new(message: impl Into<String>) -> Self {
        StoreError {
            message: message.into(),
        }
    }
}

// Helper functions for creating common errors

impl PointError {
    /// Create an InvalidKey error
    pub fn invalid_key(id: UserId) -> Self {
        PointError::InvalidKey { id }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: Point) -> Self {
        PointError::InvalidAmount { amount }
    }

    /// Create an InvalidArguments error
    pub fn invalid_arguments(id: UserId, amount: Point) -> Self {
        PointError::InvalidArguments { id, amount }
    }

    /// Create an AmountLimitExceeded error
    pub fn amount_limit_exceeded(amount: Point, limit: Point) -> Self {
        PointError::AmountLimitExceeded { amount, limit }
    }

    /// Create a HoldingLimitExceeded error
    pub fn holding_limit_exceeded(id: UserId, current: Point, amount: Point, limit: Point) -> Self {
        PointError::HoldingLimitExceeded {
            id,
            current,
            amount,
            limit,
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(id: UserId, available: Point, requested: Point) -> Self {
        PointError::InsufficientFunds {
            id,
            available,
            requested,
        }
    }

    /// Create a StorageFault error from a store error
    pub fn storage_fault(operation: &str, error: &StoreError) -> Self {
        PointError::StorageFault {
            operation: operation.to_string(),
            message: error.message.clone(),
        }
    }

    /// Create a SystemFailure error
    pub fn system_failure(operation: &str, message: impl Into<String>) -> Self {
        PointError::SystemFailure {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Classify the error as a client or server fault
    pub fn category(&self) -> ErrorCategory {
        match self {
            PointError::InvalidKey { .. }
            | PointError::InvalidAmount { .. }
            | PointError::InvalidArguments { .. }
            | PointError::AmountLimitExceeded { .. }
            | PointError::HoldingLimitExceeded { .. }
            | PointError::InsufficientFunds { .. } => ErrorCategory::Client,
            PointError::StorageFault { .. } | PointError::SystemFailure { .. } => {
                ErrorCategory::Server
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::invalid_key(PointError::InvalidKey { id: 0 }, "Invalid user id 0")]
    #[case::invalid_amount(
        PointError::InvalidAmount { amount: -5 },
        "Amount must be greater than zero, got -5"
    )]
    #[case::invalid_arguments(
        PointError::InvalidArguments { id: -1, amount: 0 },
        "Invalid user id -1 and amount 0"
    )]
    #[case::amount_limit(
        PointError::AmountLimitExceeded { amount: 100_001, limit: 100_000 },
        "Charge amount 100001 exceeds the limit of 100000"
    )]
    #[case::holding_limit(
        PointError::HoldingLimitExceeded { id: 1, current: 99_999, amount: 2, limit: 100_000 },
        "Holding limit 100000 exceeded for user 1: current 99999, charge 2"
    )]
    #[case::insufficient_funds(
        PointError::InsufficientFunds { id: 1, available: 150, requested: 200 },
        "Insufficient points for user 1: available 150, requested 200"
    )]
    #[case::storage_fault(
        PointError::StorageFault {
            operation: "charge".to_string(),
            message: "disk full".to_string(),
        },
        "Storage fault during charge: disk full"
    )]
    #[case::system_failure(
        PointError::SystemFailure {
            operation: "get_balance".to_string(),
            message: "boom".to_string(),
        },
        "System failure during get_balance: boom"
    )]
    fn test_error_display(#[case] error: PointError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::invalid_key(PointError::invalid_key(0), PointError::InvalidKey { id: 0 })]
    #[case::invalid_arguments(
        PointError::invalid_arguments(0, 0),
        PointError::InvalidArguments { id: 0, amount: 0 }
    )]
    #[case::insufficient_funds(
        PointError::insufficient_funds(1, 150, 200),
        PointError::InsufficientFunds { id: 1, available: 150, requested: 200 }
    )]
    #[case::storage_fault(
        PointError::storage_fault("use", &StoreError::new("timeout")),
        PointError::StorageFault { operation: "use".to_string(), message: "timeout".to_string() }
    )]
    fn test_helper_functions(#[case] result: PointError, #[case] expected: PointError) {
        assert_eq!(result, expected);
    }

    #[rstest]
    #[case::key(PointError::invalid_key(0), ErrorCategory::Client)]
    #[case::amount(PointError::invalid_amount(0), ErrorCategory::Client)]
    #[case::both(PointError::invalid_arguments(0, 0), ErrorCategory::Client)]
    #[case::amount_limit(
        PointError::amount_limit_exceeded(100_001, 100_000),
        ErrorCategory::Client
    )]
    #[case::holding_limit(
        PointError::holding_limit_exceeded(1, 99_999, 2, 100_000),
        ErrorCategory::Client
    )]
    #[case::funds(PointError::insufficient_funds(1, 0, 1), ErrorCategory::Client)]
    #[case::storage(
        PointError::storage_fault("charge", &StoreError::new("x")),
        ErrorCategory::Server
    )]
    #[case::system(PointError::system_failure("charge", "x"), ErrorCategory::Server)]
    fn test_error_category(#[case] error: PointError, #[case] expected: ErrorCategory) {
        assert_eq!(error.category(), expected);
    }
}
