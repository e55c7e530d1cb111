//! TableIndex implementation
//!
//! Primary and unique indexes over the rows of one table.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, TextDbError};
use crate::row::{Row, UniqueKey};

/// Primary and unique indexes for one row type
///
/// Not synchronized; the owning store guards it.
#[derive(Debug)]
pub struct TableIndex<R: Row> {
    /// id → row
    rows: BTreeMap<i64, R>,

    /// field → (value → id)
    unique: HashMap<&'static str, HashMap<String, i64>>,
}

impl<R: Row> TableIndex<R> {
    /// Create an empty index
    pub fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            unique: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&R> {
        self.rows.get(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.rows.contains_key(&id)
    }

    /// Rows in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &R> + '_ {
        self.rows.values()
    }

    /// Highest live id, if any
    pub fn max_id(&self) -> Option<i64> {
        self.rows.keys().next_back().copied()
    }

    /// Look a row up through a unique index
    pub fn find_unique(&self, field: &str, value: &str) -> Option<&R> {
        let id = self.unique.get(field)?.get(value)?;
        self.rows.get(id)
    }

    /// Check that `row` could be inserted as a new row
    pub fn check_insert(&self, row: &R) -> Result<()> {
        if self.rows.contains_key(&row.id()) {
            return Err(TextDbError::DuplicateId {
                table: R::TABLE_NAME.to_string(),
                id: row.id(),
            });
        }
        self.check_unique(&row.unique_keys(), None)
    }

    /// Add a new row
    pub fn insert(&mut self, row: R) -> Result<()> {
        self.check_insert(&row)?;

        let id = row.id();
        self.index_keys(id, row.unique_keys());
        self.rows.insert(id, row);
        Ok(())
    }

    /// Replace the stored row with the same id, returning the previous value
    pub fn replace(&mut self, row: R) -> Result<R> {
        let id = row.id();
        let previous_keys = match self.rows.get(&id) {
            Some(previous) => previous.unique_keys(),
            None => {
                return Err(TextDbError::RowNotFound {
                    table: R::TABLE_NAME.to_string(),
                    id,
                })
            }
        };

        let keys = row.unique_keys();
        self.check_unique(&keys, Some(id))?;

        self.unindex_keys(id, previous_keys);
        self.index_keys(id, keys);
        let previous = self.rows.insert(id, row);

        previous.ok_or(TextDbError::RowNotFound {
            table: R::TABLE_NAME.to_string(),
            id,
        })
    }

    /// Remove a row by id; `None` if it was not present
    pub fn remove(&mut self, id: i64) -> Option<R> {
        let row = self.rows.remove(&id)?;
        self.unindex_keys(id, row.unique_keys());
        Some(row)
    }

    /// Drop every row and index entry
    pub fn clear(&mut self) {
        self.rows.clear();
        self.unique.clear();
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Fail if any key is held by a row other than `owner`
    fn check_unique(&self, keys: &[UniqueKey], owner: Option<i64>) -> Result<()> {
        for (i, key) in keys.iter().enumerate() {
            let taken_by_other = self
                .unique
                .get(key.field)
                .and_then(|values| values.get(&key.value))
                .is_some_and(|&holder| Some(holder) != owner);

            // Two keys of the same row colliding with each other
            let repeated = keys[..i]
                .iter()
                .any(|earlier| earlier.field == key.field && earlier.value == key.value);

            if taken_by_other || repeated {
                return Err(TextDbError::UniqueConstraintViolation {
                    table: R::TABLE_NAME.to_string(),
                    field: key.field.to_string(),
                    value: key.value.clone(),
                });
            }
        }
        Ok(())
    }

    fn index_keys(&mut self, id: i64, keys: Vec<UniqueKey>) {
        for key in keys {
            self.unique.entry(key.field).or_default().insert(key.value, id);
        }
    }

    fn unindex_keys(&mut self, id: i64, keys: Vec<UniqueKey>) {
        for key in keys {
            if let Some(values) = self.unique.get_mut(key.field) {
                if values.get(&key.value) == Some(&id) {
                    values.remove(&key.value);
                }
            }
        }
    }
}

impl<R: Row> Default for TableIndex<R> {
    fn default() -> Self {
        Self::new()
    }
}
