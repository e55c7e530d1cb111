//! Tests for TableLock
//!
//! These tests verify:
//! - Reentrant acquisition on one thread
//! - Bounded waits surfacing as LockTimeout
//! - Release on every exit path
//! - Independence of different tables

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use textdb::lock::TableLock;
use textdb::TextDbError;

fn lock(table: &'static str) -> Arc<TableLock> {
    Arc::new(TableLock::new(table, Duration::from_millis(100)))
}

#[test]
fn test_acquire_and_release() {
    let lock = lock("orders");
    {
        let token = lock.acquire().unwrap();
        assert_eq!(token.table(), "orders");
        assert!(lock.is_locked());
    }
    assert!(!lock.is_locked());
}

#[test]
fn test_reentrant_on_same_thread() {
    let lock = lock("orders");
    let outer = lock.acquire().unwrap();
    let inner = lock.acquire().unwrap();
    drop(inner);
    assert!(lock.is_locked());
    drop(outer);
    assert!(!lock.is_locked());
}

#[test]
fn test_timeout_when_held_by_other_thread() {
    let lock = lock("orders");
    let _token = lock.acquire().unwrap();

    let contender = Arc::clone(&lock);
    let result = thread::spawn(move || {
        let started = Instant::now();
        let outcome = contender.acquire_for(Duration::from_millis(50)).map(|_| ());
        (outcome, started.elapsed())
    })
    .join()
    .unwrap();

    let (outcome, elapsed) = result;
    let err = outcome.unwrap_err();
    assert!(err.is_retryable());
    match err {
        TextDbError::LockTimeout { table, .. } => assert_eq!(table, "orders"),
        other => panic!("expected LockTimeout, got {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(50));
}

#[test]
fn test_waiter_proceeds_after_release() {
    let lock = Arc::new(TableLock::new("orders", Duration::from_secs(5)));
    let token = lock.acquire().unwrap();

    let waiter = Arc::clone(&lock);
    let handle = thread::spawn(move || waiter.acquire().map(|_| ()));

    thread::sleep(Duration::from_millis(50));
    drop(token);

    assert!(handle.join().unwrap().is_ok());
}

#[test]
fn test_released_when_scope_exits_with_error() {
    fn failing_step(lock: &TableLock) -> textdb::Result<()> {
        let _token = lock.acquire()?;
        Err(TextDbError::InvalidArgument("step failed".to_string()))
    }

    let lock = lock("orders");
    assert!(failing_step(&lock).is_err());
    assert!(!lock.is_locked());

    let other = Arc::clone(&lock);
    let acquired = thread::spawn(move || other.acquire().map(|_| ()))
        .join()
        .unwrap();
    assert!(acquired.is_ok());
}

#[test]
fn test_tables_do_not_block_each_other() {
    let orders = lock("orders");
    let carts = lock("carts");
    let _held = orders.acquire().unwrap();

    let handle = thread::spawn(move || carts.acquire().map(|_| ()));
    assert!(handle.join().unwrap().is_ok());
}
