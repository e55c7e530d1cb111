//! Tests for TableIndex
//!
//! These tests verify:
//! - Primary index insert/get/remove
//! - Unique index enforcement on insert and replace
//! - All-or-nothing behavior on rejection
//! - Id ordering

#[path = "../common/mod.rs"]
mod common;

use common::{Country, Named};
use textdb::index::TableIndex;
use textdb::TextDbError;

fn country(id: i64, code: &str, name: &str) -> Country {
    Country {
        id,
        code: code.to_string(),
        name: name.to_string(),
    }
}

// =============================================================================
// Primary Index Tests
// =============================================================================

#[test]
fn test_new_index_is_empty() {
    let index: TableIndex<Named> = TableIndex::new();
    assert!(index.is_empty());
    assert_eq!(index.len(), 0);
    assert_eq!(index.max_id(), None);
}

#[test]
fn test_insert_and_get() {
    let mut index = TableIndex::new();
    index.insert(Named::with_id(1, "a")).unwrap();

    assert!(index.contains(1));
    assert_eq!(index.get(1), Some(&Named::with_id(1, "a")));
    assert_eq!(index.get(2), None);
}

#[test]
fn test_insert_duplicate_id_rejected() {
    let mut index = TableIndex::new();
    index.insert(Named::with_id(1, "a")).unwrap();

    let result = index.insert(Named::with_id(1, "b"));
    assert!(matches!(result, Err(TextDbError::DuplicateId { id: 1, .. })));
    assert_eq!(index.get(1).unwrap().name, "a");
    assert_eq!(index.len(), 1);
}

#[test]
fn test_iter_is_id_ordered() {
    let mut index = TableIndex::new();
    for id in [5, -2, 3, 1] {
        index.insert(Named::with_id(id, "x")).unwrap();
    }

    let ids: Vec<i64> = index.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![-2, 1, 3, 5]);
    assert_eq!(index.max_id(), Some(5));
}

#[test]
fn test_remove() {
    let mut index = TableIndex::new();
    index.insert(Named::with_id(1, "a")).unwrap();

    assert_eq!(index.remove(1), Some(Named::with_id(1, "a")));
    assert_eq!(index.remove(1), None);
    assert!(index.is_empty());
}

#[test]
fn test_replace_missing_row() {
    let mut index: TableIndex<Named> = TableIndex::new();
    let result = index.replace(Named::with_id(9, "x"));
    assert!(matches!(result, Err(TextDbError::RowNotFound { id: 9, .. })));
}

#[test]
fn test_replace_returns_previous() {
    let mut index = TableIndex::new();
    index.insert(Named::with_id(1, "old")).unwrap();

    let previous = index.replace(Named::with_id(1, "new")).unwrap();
    assert_eq!(previous.name, "old");
    assert_eq!(index.get(1).unwrap().name, "new");
}

// =============================================================================
// Unique Index Tests
// =============================================================================

#[test]
fn test_unique_collision_on_insert() {
    let mut index = TableIndex::new();
    index.insert(country(1, "US", "United States")).unwrap();

    let result = index.insert(country(2, "US", "Duplicate"));
    match result {
        Err(TextDbError::UniqueConstraintViolation { field, value, .. }) => {
            assert_eq!(field, "code");
            assert_eq!(value, "US");
        }
        other => panic!("expected UniqueConstraintViolation, got {:?}", other),
    }
    assert_eq!(index.len(), 1);
    assert!(!index.contains(2));
}

#[test]
fn test_find_unique() {
    let mut index = TableIndex::new();
    index.insert(country(1, "US", "United States")).unwrap();
    index.insert(country(2, "FR", "France")).unwrap();

    assert_eq!(index.find_unique("code", "FR").unwrap().id, 2);
    assert!(index.find_unique("code", "DE").is_none());
    assert!(index.find_unique("name", "France").is_none());
}

#[test]
fn test_replace_keeping_own_unique_value() {
    let mut index = TableIndex::new();
    index.insert(country(1, "US", "United States")).unwrap();

    index.replace(country(1, "US", "USA")).unwrap();
    assert_eq!(index.find_unique("code", "US").unwrap().name, "USA");
}

#[test]
fn test_replace_moves_unique_value() {
    let mut index = TableIndex::new();
    index.insert(country(1, "UK", "United Kingdom")).unwrap();

    index.replace(country(1, "GB", "United Kingdom")).unwrap();

    assert!(index.find_unique("code", "UK").is_none());
    assert_eq!(index.find_unique("code", "GB").unwrap().id, 1);

    // The released value is free for another row
    index.insert(country(2, "UK", "Ukraine (typo)")).unwrap();
    assert_eq!(index.find_unique("code", "UK").unwrap().id, 2);
}

#[test]
fn test_replace_collision_leaves_index_unchanged() {
    let mut index = TableIndex::new();
    index.insert(country(1, "US", "United States")).unwrap();
    index.insert(country(2, "FR", "France")).unwrap();

    let result = index.replace(country(2, "US", "France"));
    assert!(matches!(
        result,
        Err(TextDbError::UniqueConstraintViolation { .. })
    ));

    assert_eq!(index.get(2).unwrap().code, "FR");
    assert_eq!(index.find_unique("code", "FR").unwrap().id, 2);
    assert_eq!(index.find_unique("code", "US").unwrap().id, 1);
}

#[test]
fn test_remove_releases_unique_value() {
    let mut index = TableIndex::new();
    index.insert(country(1, "US", "United States")).unwrap();
    index.remove(1);

    index.insert(country(2, "US", "United States")).unwrap();
    assert_eq!(index.find_unique("code", "US").unwrap().id, 2);
}

#[test]
fn test_clear() {
    let mut index = TableIndex::new();
    index.insert(country(1, "US", "United States")).unwrap();
    index.clear();

    assert!(index.is_empty());
    assert!(index.find_unique("code", "US").is_none());
    index.insert(country(1, "US", "United States")).unwrap();
}
