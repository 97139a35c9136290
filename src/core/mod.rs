//! Core business logic module
//!
//! This module contains the balance transaction components:
//! - `traits` - Storage interfaces the service depends on
//! - `sequencer` - Key-scoped sequential execution of units of work
//! - `service` - Validation and business rules for charge/use
//! - `balance_store` - In-memory balance table
//! - `history_store` - In-memory append-only history

pub mod balance_store;
pub mod history_store;
pub mod sequencer;
pub mod service;
pub mod traits;

pub use balance_store::MemoryBalanceStore;
pub use history_store::MemoryHistoryStore;
pub use sequencer::KeyedSequencer;
pub use service::{
    validate_request, validate_user_id, PendingResult, PointService, ReadConsistency,
    ServiceConfig,
};
pub use traits::{BalanceStore, HistoryStore};
