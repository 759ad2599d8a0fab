use booking_engine::ledger::memory::InMemoryLedger;
use booking_engine::ledger::{reserve_many, InventoryLedger, LedgerError};
use std::sync::Arc;

#[tokio::test]
async fn concurrent_reserves_never_oversell() {
    let ledger = Arc::new(InMemoryLedger::new());
    ledger.add_unit("gate-a", 5).await;

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let ledger = Arc::clone(&ledger);
        tasks.push(tokio::spawn(
            async move { ledger.reserve("gate-a", 2).await },
        ));
    }

    let mut successes = 0;
    let mut capacity_failures = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => successes += 1,
            Err(LedgerError::InsufficientCapacity(_)) => capacity_failures += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    // 10 attempts of 2 against capacity 5: at most 2 can win.
    assert!(successes <= 2, "oversold: {successes} reservations of 2 on capacity 5");
    assert_eq!(successes + capacity_failures, 10);

    let (total, reserved, confirmed) = ledger.counters("gate-a").await.unwrap();
    assert_eq!(total, 5);
    assert_eq!(reserved, successes * 2);
    assert_eq!(confirmed, 0);
}

#[tokio::test]
async fn commit_is_idempotent() {
    let ledger = InMemoryLedger::new();
    ledger.add_unit("gate-a", 5).await;

    let hold = ledger.reserve("gate-a", 3).await.unwrap();
    ledger.commit(hold.token).await.unwrap();
    ledger.commit(hold.token).await.unwrap();

    assert_eq!(ledger.counters("gate-a").await.unwrap(), (5, 0, 3));
}

#[tokio::test]
async fn release_is_idempotent() {
    let ledger = InMemoryLedger::new();
    ledger.add_unit("gate-a", 5).await;

    let hold = ledger.reserve("gate-a", 3).await.unwrap();
    ledger.release(hold.token).await.unwrap();
    ledger.release(hold.token).await.unwrap();

    assert_eq!(ledger.counters("gate-a").await.unwrap(), (5, 0, 0));
}

#[tokio::test]
async fn released_capacity_is_sellable_again() {
    let ledger = InMemoryLedger::new();
    ledger.add_unit("gate-a", 5).await;

    let hold = ledger.reserve("gate-a", 4).await.unwrap();
    assert!(matches!(
        ledger.reserve("gate-a", 2).await,
        Err(LedgerError::InsufficientCapacity(_))
    ));

    ledger.release(hold.token).await.unwrap();
    assert!(ledger.reserve("gate-a", 5).await.is_ok());
}

#[tokio::test]
async fn multi_unit_reservation_is_all_or_nothing() {
    let ledger = InMemoryLedger::new();
    ledger.add_unit("gate-a", 10).await;
    ledger.add_unit("gate-b", 1).await;

    let wants = vec![("gate-a".to_string(), 2), ("gate-b".to_string(), 5)];
    let result = reserve_many(&ledger, &wants).await;
    assert!(matches!(result, Err(LedgerError::InsufficientCapacity(unit)) if unit == "gate-b"));

    // The failed composite must leave no partial hold on gate-a.
    assert_eq!(ledger.counters("gate-a").await.unwrap(), (10, 0, 0));
    assert_eq!(ledger.counters("gate-b").await.unwrap(), (1, 0, 0));
}

#[tokio::test]
async fn confirmed_capacity_stays_sold() {
    let ledger = InMemoryLedger::new();
    ledger.add_unit("gate-a", 5).await;

    // First buyer takes 3 and pays.
    let hold = ledger.reserve("gate-a", 3).await.unwrap();
    ledger.commit(hold.token).await.unwrap();
    assert_eq!(ledger.counters("gate-a").await.unwrap(), (5, 0, 3));

    // Only 2 remain: a second booking for 3 must fail, for 2 must succeed.
    assert!(matches!(
        ledger.reserve("gate-a", 3).await,
        Err(LedgerError::InsufficientCapacity(_))
    ));
    assert!(ledger.reserve("gate-a", 2).await.is_ok());
}

#[tokio::test]
async fn overlapping_releases_free_capacity_exactly_once() {
    // Two reaper sweeps racing over the same stale booking must not hand the
    // pool back its quantity twice.
    let ledger = Arc::new(InMemoryLedger::new());
    ledger.add_unit("gate-a", 5).await;
    let hold = ledger.reserve("gate-a", 3).await.unwrap();

    let first = {
        let ledger = Arc::clone(&ledger);
        let token = hold.token;
        tokio::spawn(async move { ledger.release(token).await })
    };
    let second = {
        let ledger = Arc::clone(&ledger);
        let token = hold.token;
        tokio::spawn(async move { ledger.release(token).await })
    };
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    assert_eq!(ledger.counters("gate-a").await.unwrap(), (5, 0, 0));
}

#[tokio::test]
async fn unknown_unit_is_reported() {
    let ledger = InMemoryLedger::new();
    assert!(matches!(
        ledger.reserve("ghost", 1).await,
        Err(LedgerError::UnknownUnit(_))
    ));
}
