//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `balance`: Balance, identifiers and the holding limit
//! - `transaction`: Transaction kinds, history records and requests
//! - `error`: Error types for the point engine

pub mod balance;
pub mod error;
pub mod transaction;

pub use balance::{now_millis, Balance, Point, UserId, MAX_HOLDING};
pub use error::{ErrorCategory, PointError, StoreError};
pub use transaction::{PointRequest, TransactionKind, TransactionRecord};
