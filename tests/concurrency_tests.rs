//! Concurrency properties of the point service
//!
//! These tests drive `PointService` directly with many in-flight requests
//! and check that per-user ordering holds, that no update is lost, and that
//! different users do not wait on each other.

use async_trait::async_trait;
use futures::future::join_all;
use rust_point_engine::core::{BalanceStore, MemoryBalanceStore, MemoryHistoryStore, PointService};
use rust_point_engine::{Balance, Point, PointError, StoreError, TransactionKind, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};

fn in_memory_service() -> (PointService, Arc<MemoryBalanceStore>) {
    let balances = Arc::new(MemoryBalanceStore::new());
    let history = Arc::new(MemoryHistoryStore::new());
    (PointService::new(balances.clone(), history), balances)
}

/// Balance store whose reads take a per-user amount of time
#[derive(Debug)]
struct PerUserLatencyStore {
    inner: MemoryBalanceStore,
    read_latency: HashMap<UserId, Duration>,
}

#[async_trait]
impl BalanceStore for PerUserLatencyStore {
    async fn read(&self, id: UserId) -> Result<Balance, StoreError> {
        if let Some(latency) = self.read_latency.get(&id) {
            sleep(*latency).await;
        }
        self.inner.read(id).await
    }

    async fn write(&self, id: UserId, amount: Point) -> Result<(), StoreError> {
        self.inner.write(id, amount).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_burst_of_charges_for_one_user_applies_in_submission_order() {
    let (service, _) = in_memory_service();
    let amounts = [
        100, 50, 10, 30, 20, 40, 50, 60, 70, 80, 90, 110, 120, 120, 150, 180, 50, 20, 40, 70,
    ];

    let pending: Vec<_> = amounts.iter().map(|amount| service.charge(1, *amount)).collect();
    let results = join_all(pending).await;

    // Every response carries the prefix sum up to its own request
    let mut expected = 0;
    for (result, amount) in results.iter().zip(amounts) {
        expected += amount;
        assert_eq!(result.as_ref().unwrap().amount, expected);
    }
    assert_eq!(service.get_balance(1).await.unwrap().amount, 1460);

    let history = service.get_history(1).await.unwrap();
    let recorded: Vec<Point> = history.iter().map(|record| record.amount).collect();
    assert_eq!(recorded, amounts);
    assert!(history
        .windows(2)
        .all(|pair| pair[0].sequence_id < pair[1].sequence_id));
    assert!(history
        .iter()
        .all(|record| record.kind == TransactionKind::Charge));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_requests_from_many_tasks_lose_no_update() {
    let (service, _) = in_memory_service();
    let users: [UserId; 4] = [1, 2, 3, 4];

    // Deterministic pseudo-random mix of charges and uses per task
    let mut handles = vec![];
    for task in 0..16u64 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let mut state = task * 2_654_435_761 + 1;
            let mut outcomes = vec![];
            for _ in 0..25 {
                state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
                let user = users[(state >> 33) as usize % users.len()];
                let amount = (state >> 40) as Point % 300 + 1;
                let (kind, result) = if (state >> 20) % 3 == 0 {
                    (TransactionKind::Use, service.use_points(user, amount).await)
                } else {
                    (TransactionKind::Charge, service.charge(user, amount).await)
                };
                outcomes.push((user, kind, amount, result));
            }
            outcomes
        }));
    }

    let mut committed: HashMap<UserId, (Point, usize)> = HashMap::new();
    for handle in handles {
        for (user, kind, amount, result) in handle.await.unwrap() {
            match result {
                Ok(_) => {
                    let entry = committed.entry(user).or_default();
                    entry.0 += match kind {
                        TransactionKind::Charge => amount,
                        TransactionKind::Use => -amount,
                    };
                    entry.1 += 1;
                }
                Err(PointError::InsufficientFunds { .. }) => {}
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
    }

    for user in users {
        let (net, count) = committed.get(&user).copied().unwrap_or_default();
        let balance = service.get_balance(user).await.unwrap();
        let history = service.get_history(user).await.unwrap();

        assert_eq!(balance.amount, net, "balance of user {}", user);
        assert_eq!(history.len(), count, "history of user {}", user);

        // Replaying the ledger never dips below zero and ends at the balance
        let mut running = 0;
        for record in &history {
            running += match record.kind {
                TransactionKind::Charge => record.amount,
                TransactionKind::Use => -record.amount,
            };
            assert!(running >= 0);
        }
        assert_eq!(running, balance.amount);
    }
    assert_eq!(service.pending_users(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_user_does_not_delay_fast_user() {
    let balances = Arc::new(PerUserLatencyStore {
        inner: MemoryBalanceStore::new(),
        read_latency: HashMap::from([
            (1, Duration::from_millis(200)),
            (2, Duration::from_millis(10)),
        ]),
    });
    let service = PointService::new(balances, Arc::new(MemoryHistoryStore::new()));
    let finished = Arc::new(Mutex::new(Vec::new()));
    let start = Instant::now();

    // The slow user is submitted first
    let slow = {
        let finished = Arc::clone(&finished);
        let pending = service.charge(1, 10);
        async move {
            pending.await.unwrap();
            finished.lock().unwrap().push(1);
        }
    };
    let fast = {
        let finished = Arc::clone(&finished);
        let pending = service.charge(2, 10);
        async move {
            pending.await.unwrap();
            finished.lock().unwrap().push(2);
        }
    };

    tokio::join!(slow, fast);

    assert_eq!(*finished.lock().unwrap(), vec![2, 1]);
    assert!(start.elapsed() < Duration::from_millis(210 + 10));
}

#[tokio::test(start_paused = true)]
async fn test_fast_request_waits_for_slow_request_of_same_user() {
    let balances = Arc::new(MemoryBalanceStore::with_latency(Duration::from_millis(100)));
    let service = PointService::new(balances, Arc::new(MemoryHistoryStore::new()));

    // Without ordering, the use would read the empty balance and be rejected
    let charge = service.charge(1, 100);
    let use_points = service.use_points(1, 100);

    let (charged, used) = tokio::join!(charge, use_points);

    assert_eq!(charged.unwrap().amount, 100);
    assert_eq!(used.unwrap().amount, 0);

    let kinds: Vec<_> = service
        .get_history(1)
        .await
        .unwrap()
        .iter()
        .map(|record| record.kind)
        .collect();
    assert_eq!(kinds, vec![TransactionKind::Charge, TransactionKind::Use]);
}

#[tokio::test]
async fn test_limit_scenarios() {
    let (service, balances) = in_memory_service();
    balances.write(1, 99_999).await.unwrap();
    balances.write(2, 150).await.unwrap();

    assert!(matches!(
        service.charge(3, 100_001).await,
        Err(PointError::AmountLimitExceeded { .. })
    ));
    assert!(matches!(
        service.charge(1, 2).await,
        Err(PointError::HoldingLimitExceeded { .. })
    ));
    assert_eq!(service.get_balance(1).await.unwrap().amount, 99_999);

    assert!(matches!(
        service.use_points(2, 200).await,
        Err(PointError::InsufficientFunds { .. })
    ));
    assert_eq!(service.use_points(2, 100).await.unwrap().amount, 50);

    let history = service.get_history(2).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, TransactionKind::Use);
    assert_eq!(history[0].amount, 100);
    assert!(service.get_history(1).await.unwrap().is_empty());
}
