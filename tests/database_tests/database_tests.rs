//! Tests for Database and Config
//!
//! These tests verify:
//! - One store instance per row type
//! - Table name clashes between row types are rejected
//! - flush_all / close persist every dirty table
//! - The interval flusher writes dirty tables in the background
//! - JSON settings loading and validation

#[path = "../common/mod.rs"]
mod common;

use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::{reopen, Country, ItemV1, ItemV2, Named, Product};
use tempfile::TempDir;
use textdb::{Config, Database, FlushStrategy, TextDbError};

// =============================================================================
// Helper Functions
// =============================================================================

fn open_db(dir: &TempDir, strategy: FlushStrategy) -> Database {
    let config = Config::builder()
        .data_dir(dir.path())
        .lock_timeout_ms(500)
        .flush_strategy(strategy)
        .flush_on_drop(false)
        .build();
    Database::open(config).unwrap()
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

// =============================================================================
// Table Registry
// =============================================================================

#[test]
fn test_open_creates_data_dir() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("nested").join("data");
    let db = Database::open_path(&nested).unwrap();
    assert!(nested.is_dir());
    assert_eq!(db.data_dir(), nested.as_path());
}

#[test]
fn test_same_store_per_row_type() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir, FlushStrategy::Manual);

    let first = db.table::<Country>().unwrap();
    let second = db.table::<Country>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    first.insert(Country::new("US", "United States")).unwrap();
    assert_eq!(second.record_count().unwrap(), 1);
}

#[test]
fn test_table_names() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir, FlushStrategy::Manual);
    assert!(db.table_names().is_empty());

    db.table::<Country>().unwrap();
    db.table::<Product>().unwrap();
    db.table::<Country>().unwrap();

    assert_eq!(db.table_names(), vec!["countries", "products"]);
}

#[test]
fn test_table_name_clash_rejected() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir, FlushStrategy::Manual);

    db.table::<ItemV1>().unwrap();
    let result = db.table::<ItemV2>();
    assert!(matches!(result, Err(TextDbError::InvalidArgument(_))));
}

#[test]
fn test_invalid_config_rejected() {
    let result = Database::open(Config::builder().data_dir("").build());
    assert!(matches!(result, Err(TextDbError::Config(_))));
}

// =============================================================================
// Flushing
// =============================================================================

#[test]
fn test_flush_all_persists_every_table() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir, FlushStrategy::Manual);

    db.table::<Country>()
        .unwrap()
        .insert(Country::new("US", "United States"))
        .unwrap();
    db.table::<Product>()
        .unwrap()
        .insert(Product::new("SKU-1", 5))
        .unwrap();

    db.flush_all().unwrap();

    assert_eq!(reopen::<Country>(&dir).record_count().unwrap(), 1);
    assert_eq!(reopen::<Product>(&dir).record_count().unwrap(), 1);
}

#[test]
fn test_close_flushes() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir, FlushStrategy::Manual);
    db.table::<Named>().unwrap().insert(Named::new("kept")).unwrap();

    db.close().unwrap();

    let reloaded = reopen::<Named>(&dir);
    assert_eq!(reloaded.select_by_id(1).unwrap().unwrap().name, "kept");
}

#[test]
fn test_interval_flusher_writes_dirty_tables() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir, FlushStrategy::Interval { ms: 20 });
    let store = db.table::<Named>().unwrap();

    store.insert(Named::new("background")).unwrap();

    assert!(wait_until(Duration::from_secs(5), || !store.is_dirty()));
    assert!(store.path().exists());

    let reloaded = reopen::<Named>(&dir);
    assert_eq!(reloaded.record_count().unwrap(), 1);
    db.close().unwrap();
}

#[test]
fn test_drop_stops_flusher() {
    let dir = TempDir::new().unwrap();
    let store = {
        let db = open_db(&dir, FlushStrategy::Interval { ms: 20 });
        db.table::<Named>().unwrap()
    };

    // The store outlives the database; nothing flushes it any more
    store.insert(Named::new("late")).unwrap();
    thread::sleep(Duration::from_millis(100));
    assert!(store.is_dirty());
}

// =============================================================================
// JSON Settings
// =============================================================================

#[test]
fn test_config_from_json_str() {
    let config = Config::from_json_str(
        r#"{
            "data_dir": "/tmp/textdb-test",
            "lock_timeout_ms": 2000,
            "flush": { "every_n_mutations": 50 },
            "flush_on_drop": false
        }"#,
    )
    .unwrap();

    assert_eq!(config.data_dir, std::path::PathBuf::from("/tmp/textdb-test"));
    assert_eq!(config.lock_timeout(), Duration::from_secs(2));
    assert_eq!(config.flush_strategy, FlushStrategy::EveryNMutations { count: 50 });
    assert!(!config.flush_on_drop);
}

#[test]
fn test_config_json_defaults() {
    let config = Config::from_json_str(r#"{ "flush": "manual" }"#).unwrap();
    let defaults = Config::default();
    assert_eq!(config.data_dir, defaults.data_dir);
    assert_eq!(config.lock_timeout_ms, 5000);
    assert_eq!(config.flush_strategy, FlushStrategy::Manual);
    assert!(config.flush_on_drop);

    let interval = Config::from_json_str(r#"{ "flush": { "interval_ms": 250 } }"#).unwrap();
    assert_eq!(interval.flush_strategy, FlushStrategy::Interval { ms: 250 });
}

#[test]
fn test_config_json_rejects_bad_documents() {
    for text in [
        r#"{ "unknown_key": 1 }"#,
        r#"{ "lock_timeout_ms": 0 }"#,
        r#"{ "flush": { "interval_ms": 0 } }"#,
        r#"{ "flush": "sometimes" }"#,
        "not json",
    ] {
        let result = Config::from_json_str(text);
        assert!(matches!(result, Err(TextDbError::Config(_))), "accepted {}", text);
    }
}

#[test]
fn test_config_from_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("textdb.json");
    fs::write(&path, r#"{ "lock_timeout_ms": 750 }"#).unwrap();

    let config = Config::from_json_file(&path).unwrap();
    assert_eq!(config.lock_timeout_ms, 750);

    let missing = Config::from_json_file(&dir.path().join("absent.json"));
    assert!(matches!(missing, Err(TextDbError::Config(_))));
}
