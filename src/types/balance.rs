//! Balance-related types for the Rust Point Engine
//!
//! This module defines the per-user point balance and the identifiers
//! used to address it.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// User identifier
///
/// Signed so that zero and negative ids coming from callers can be
/// represented and rejected by validation instead of being coerced.
pub type UserId = i64;

/// Point amount
///
/// Signed for the same reason as [`UserId`]. Stored balances are always
/// within `0..=MAX_HOLDING`.
pub type Point = i64;

/// Upper bound on the balance a single user may hold.
///
/// A single charge larger than this is also rejected outright.
pub const MAX_HOLDING: Point = 100_000;

/// Current point balance of a user
///
/// Owned by a [`BalanceStore`](crate::core::BalanceStore) and only mutated
/// inside a sequenced charge/use unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// The user this balance belongs to
    pub id: UserId,

    /// Points currently held (never negative, never above the holding limit)
    pub amount: Point,

    /// Wall-clock time of the last update in milliseconds since the UNIX epoch
    pub updated_at_millis: u64,
}

impl Balance {
    /// Create the zero balance a store reports for a user it has never seen
    ///
    /// # Arguments
    ///
    /// * `id` - The user the balance belongs to
    ///
    /// # Returns
    ///
    /// A balance with `amount = 0` stamped with the current time.
    pub fn empty(id: UserId) -> Self {
        Balance {
            id,
            amount: 0,
            updated_at_millis: now_millis(),
        }
    }
}

/// Milliseconds since the UNIX epoch
///
/// A clock set before 1970 yields 0 rather than an error.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_balance_has_zero_amount() {
        let balance = Balance::empty(7);

        assert_eq!(balance.id, 7);
        assert_eq!(balance.amount, 0);
        assert!(balance.updated_at_millis > 0);
    }

    #[test]
    fn test_now_millis_is_monotonic_enough() {
        let first = now_millis();
        let second = now_millis();
        assert!(second >= first);
    }
}
