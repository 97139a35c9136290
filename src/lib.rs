//! Rust Point Engine Library
//! # Overview
//!
//! This library maintains a per-user point balance that is charged and used
//! by concurrent requests. Mutations for the same user are applied one at a
//! time in submission order; different users never wait on each other.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Balance, TransactionRecord, errors)
//! - [`core`] - Business logic components:
//!   - [`core::sequencer`] - Key-scoped sequential execution
//!   - [`core::service`] - Validation and charge/use rules
//!   - [`core::traits`] - Balance and history store interfaces
//!   - [`core::balance_store`] / [`core::history_store`] - In-memory stores
//! - [`io`] - CSV request parsing and output
//! - [`replay`] - Replays a CSV of requests through the service
//! - [`cli`] - CLI arguments parsing
//!
//! # Rules
//!
//! - **Charge**: rejected if the amount exceeds the holding limit
//!   (100,000) or the resulting balance would exceed it
//! - **Use**: rejected if the balance does not cover the amount
//! - Every committed mutation appends one record to the history

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod replay;
pub mod types;

pub use self::core::{KeyedSequencer, PointService, ReadConsistency, ServiceConfig};
pub use replay::{EngineConfig, ReplayReport, Replayer};
pub use types::{
    Balance, ErrorCategory, Point, PointError, PointRequest, StoreError, TransactionKind,
    TransactionRecord, UserId, MAX_HOLDING,
};
