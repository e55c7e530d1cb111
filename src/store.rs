//! Store Module
//!
//! The table store that coordinates index, lock and table file for one row
//! type.
//!
//! ## Responsibilities
//! - Load the table file on first use, exactly once
//! - Serve every read from the in-memory index
//! - Assign ids and enforce primary/unique constraints on mutation
//! - Track pending changes and write them back (write-behind)

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use parking_lot::RwLock;

use crate::codec::{decode_row, encode_row};
use crate::config::{Config, FlushStrategy};
use crate::error::{Result, TextDbError};
use crate::index::TableIndex;
use crate::lock::{LockToken, TableLock};
use crate::row::{Row, UNASSIGNED_ID};
use crate::storage::TableFile;

/// First id handed out by an empty (or truncated) table
pub const FIRST_ID: i64 = 1;

/// Options for [`TableStore::insert_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOptions {
    /// Keep a non-zero id carried by the row instead of allocating one
    pub use_supplied_id: bool,
}

impl InsertOptions {
    pub fn new(use_supplied_id: bool) -> Self {
        Self { use_supplied_id }
    }

    /// Keep the row's own id (negative ids included)
    pub fn supplied_id() -> Self {
        Self::new(true)
    }
}

/// Changes made since the last successful flush
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChanges {
    /// Ids inserted or updated
    pub written: BTreeSet<i64>,
    /// Ids deleted
    pub removed: BTreeSet<i64>,
    /// The table was truncated
    pub truncated: bool,
    /// Number of mutating calls that changed something
    pub mutations: usize,
}

impl PendingChanges {
    pub fn is_empty(&self) -> bool {
        self.mutations == 0
    }

    fn record_write(&mut self, id: i64) {
        self.removed.remove(&id);
        self.written.insert(id);
        self.mutations += 1;
    }

    fn record_remove(&mut self, id: i64) {
        self.written.remove(&id);
        self.removed.insert(id);
        self.mutations += 1;
    }

    fn record_truncate(&mut self) {
        self.written.clear();
        self.removed.clear();
        self.truncated = true;
        self.mutations += 1;
    }
}

/// In-memory table plus allocator and change tracking
struct TableState<R: Row> {
    loaded: bool,
    index: TableIndex<R>,
    next_id: i64,
    changes: PendingChanges,
}

/// CRUD access to one table
///
/// ## Concurrency Model
///
/// - **Mutations** (insert/update/delete/truncate) and **flushes** run under
///   the table's [`TableLock`], so they are linearized per table. The lock is
///   reentrant: a caller holding [`TableStore::table_lock`] can call the
///   mutators on the same thread.
/// - **Reads** only take the `RwLock` read side and run concurrently with
///   each other. The first read of a table takes the table lock to load the
///   file exactly once.
/// - The `RwLock` is never held while waiting for the table lock.
///
/// ## Persistence
///
/// Mutations are visible to every reader immediately. The file is only
/// guaranteed current after [`TableStore::force_write`] or an automatic flush
/// point (see [`FlushStrategy`] and `flush_on_drop`).
pub struct TableStore<R: Row> {
    file: TableFile,
    lock: TableLock,
    state: RwLock<TableState<R>>,
    flush_strategy: FlushStrategy,
    flush_on_drop: bool,
}

impl<R: Row> TableStore<R> {
    /// Open the store for `R` inside `config.data_dir`
    ///
    /// Nothing is read from disk until the first operation.
    /// `FlushStrategy::Interval` needs the background flusher owned by
    /// [`crate::Database`] and is rejected here.
    pub fn open(config: &Config) -> Result<Self> {
        if let FlushStrategy::Interval { ms } = config.flush_strategy {
            return Err(TextDbError::Config(format!(
                "interval flushing ({}ms) needs a Database; a standalone store would never flush",
                ms
            )));
        }
        Self::open_managed(config)
    }

    /// Open a store whose interval flushes are driven by a `Database`
    pub(crate) fn open_managed(config: &Config) -> Result<Self> {
        config.validate()?;
        validate_table_name(R::TABLE_NAME)?;
        fs::create_dir_all(&config.data_dir)?;

        Ok(Self {
            file: TableFile::new(&config.data_dir, R::TABLE_NAME),
            lock: TableLock::new(R::TABLE_NAME, config.lock_timeout()),
            state: RwLock::new(TableState {
                loaded: false,
                index: TableIndex::new(),
                next_id: FIRST_ID,
                changes: PendingChanges::default(),
            }),
            flush_strategy: config.flush_strategy,
            flush_on_drop: config.flush_on_drop,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(&Config::builder().data_dir(path).build())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Every live row, in ascending id order
    pub fn select_all(&self) -> Result<Vec<R>> {
        self.ensure_loaded()?;
        Ok(self.state.read().index.iter().cloned().collect())
    }

    /// The row with `id`, if present
    pub fn select_by_id(&self, id: i64) -> Result<Option<R>> {
        self.ensure_loaded()?;
        Ok(self.state.read().index.get(id).cloned())
    }

    /// Rows matching `predicate`, in ascending id order
    ///
    /// The predicate runs on a snapshot, so it may call back into this store.
    pub fn select_where<F>(&self, mut predicate: F) -> Result<Vec<R>>
    where
        F: FnMut(&R) -> bool,
    {
        let rows = self.select_all()?;
        Ok(rows.into_iter().filter(|row| predicate(row)).collect())
    }

    /// The row holding `value` in the unique field `field`
    pub fn find_unique(&self, field: &str, value: &str) -> Result<Option<R>> {
        self.ensure_loaded()?;
        Ok(self.state.read().index.find_unique(field, value).cloned())
    }

    pub fn id_exists(&self, id: i64) -> Result<bool> {
        self.ensure_loaded()?;
        Ok(self.state.read().index.contains(id))
    }

    /// Number of live rows
    pub fn record_count(&self) -> Result<usize> {
        self.ensure_loaded()?;
        Ok(self.state.read().index.len())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert a new row, allocating its id
    ///
    /// Any id already carried by `row` is replaced. Returns the new id.
    pub fn insert(&self, row: R) -> Result<i64> {
        self.insert_with(row, InsertOptions::default())
    }

    /// Insert a new row with explicit options
    ///
    /// With `use_supplied_id`, a non-zero id on the row is kept (negative ids
    /// included) and must not collide with a live row.
    pub fn insert_with(&self, row: R, options: InsertOptions) -> Result<i64> {
        let row = Self::admit(row)?;
        self.mutate(|state| Self::insert_locked(state, row, options))
    }

    /// Replace the stored row with the same id
    pub fn update(&self, row: R) -> Result<()> {
        let row = Self::admit(row)?;
        self.mutate(|state| Self::update_locked(state, row).map(|_| ()))
    }

    /// Insert when the id is unassigned or unknown, update otherwise
    ///
    /// Returns the row's id.
    pub fn insert_or_update(&self, row: R) -> Result<i64> {
        let row = Self::admit(row)?;
        self.mutate(|state| {
            let id = row.id();
            if id == UNASSIGNED_ID || !state.index.contains(id) {
                Self::insert_locked(state, row, InsertOptions::supplied_id())
            } else {
                Self::update_locked(state, row)?;
                Ok(id)
            }
        })
    }

    /// Delete `row` by its id; returns whether a row was removed
    pub fn delete(&self, row: &R) -> Result<bool> {
        self.delete_by_id(row.id())
    }

    /// Delete by id; deleting an absent id is a no-op
    pub fn delete_by_id(&self, id: i64) -> Result<bool> {
        self.mutate(|state| Ok(Self::remove_locked(state, id)))
    }

    /// Delete several rows under one lock; returns how many were removed
    pub fn delete_many<'a, I>(&self, rows: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a R>,
    {
        let ids: Vec<i64> = rows.into_iter().map(Row::id).collect();
        self.mutate(|state| {
            Ok(ids
                .iter()
                .filter(|&&id| Self::remove_locked(state, id))
                .count())
        })
    }

    /// Remove every row and reset the id allocator
    ///
    /// Does not read the table file, so it also recovers a table whose file
    /// no longer loads.
    pub fn truncate(&self) -> Result<()> {
        let _token = self.lock.acquire()?;
        {
            let mut state = self.state.write();
            let removed = state.index.len();
            state.index.clear();
            state.next_id = FIRST_ID;
            state.loaded = true;
            state.changes.record_truncate();
            tracing::debug!(table = R::TABLE_NAME, removed, "table truncated");
        }
        self.after_mutation();
        Ok(())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write all pending changes to the table file before returning
    pub fn force_write(&self) -> Result<()> {
        let _token = self.lock.acquire()?;
        self.write_locked().map(|_| ())
    }

    /// Flush only if something changed; returns whether a write happened
    pub fn flush_if_dirty(&self) -> Result<bool> {
        if !self.is_dirty() {
            return Ok(false);
        }
        let _token = self.lock.acquire()?;
        self.write_locked()
    }

    /// True if there are changes not yet written to the file
    pub fn is_dirty(&self) -> bool {
        !self.state.read().changes.is_empty()
    }

    /// Snapshot of the changes not yet written to the file
    pub fn pending_changes(&self) -> PendingChanges {
        self.state.read().changes.clone()
    }

    // =========================================================================
    // Locking
    // =========================================================================

    /// Hold the table lock to make a read-modify-write sequence atomic
    ///
    /// `select_by_id` followed by `update` is not atomic on its own; holding
    /// the token across both keeps other mutators out.
    pub fn table_lock(&self) -> Result<LockToken<'_>> {
        self.lock.acquire()
    }

    /// Like [`TableStore::table_lock`] with an explicit timeout
    pub fn table_lock_for(&self, timeout: Duration) -> Result<LockToken<'_>> {
        self.lock.acquire_for(timeout)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn table_name(&self) -> &'static str {
        R::TABLE_NAME
    }

    /// Path of the backing table file
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// True once the table file has been read (or the table truncated)
    pub fn is_loaded(&self) -> bool {
        self.state.read().loaded
    }

    /// Id the next allocating insert will use
    pub fn next_id(&self) -> Result<i64> {
        self.ensure_loaded()?;
        Ok(self.state.read().next_id)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Run a mutation under the table lock, loading the table first if needed
    fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut TableState<R>) -> Result<T>,
    {
        let _token = self.lock.acquire()?;
        let result = {
            let mut state = self.state.write();
            if !state.loaded {
                self.load_into(&mut *state)?;
            }
            f(&mut *state)?
        };
        self.after_mutation();
        Ok(result)
    }

    /// Validate a row and bring it to the form the table file stores
    ///
    /// Caching the decoded encoding keeps the in-memory row equal to what a
    /// reload produces (timestamps, for example, keep 100ns precision).
    fn admit(row: R) -> Result<R> {
        row.validate()?;
        decode_row::<R>(&encode_row(&row))
    }

    fn insert_locked(state: &mut TableState<R>, mut row: R, options: InsertOptions) -> Result<i64> {
        let supplied = options.use_supplied_id && row.id() != UNASSIGNED_ID;
        let id = if supplied { row.id() } else { state.next_id };

        let next_id = if id >= state.next_id {
            id.checked_add(1).ok_or_else(|| {
                TextDbError::InvalidArgument(format!(
                    "id {} would exhaust the id allocator of table '{}'",
                    id,
                    R::TABLE_NAME
                ))
            })?
        } else {
            state.next_id
        };
        row.set_id(id);

        // Rejects duplicate ids and unique collisions before touching anything
        state.index.insert(row)?;

        state.next_id = next_id;
        state.changes.record_write(id);
        Ok(id)
    }

    /// Returns false when the new value equals the stored one
    fn update_locked(state: &mut TableState<R>, row: R) -> Result<bool> {
        let id = row.id();
        match state.index.get(id) {
            None => {
                return Err(TextDbError::RowNotFound {
                    table: R::TABLE_NAME.to_string(),
                    id,
                })
            }
            Some(current) if *current == row => return Ok(false),
            Some(_) => {}
        }

        state.index.replace(row)?;
        state.changes.record_write(id);
        Ok(true)
    }

    fn remove_locked(state: &mut TableState<R>, id: i64) -> bool {
        if state.index.remove(id).is_some() {
            state.changes.record_remove(id);
            true
        } else {
            false
        }
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.state.read().loaded {
            return Ok(());
        }

        let _token = self.lock.acquire()?;
        let mut state = self.state.write();
        if !state.loaded {
            self.load_into(&mut *state)?;
        }
        Ok(())
    }

    /// Replace the in-memory table with the file content (table lock held)
    fn load_into(&self, state: &mut TableState<R>) -> Result<()> {
        let mut index = TableIndex::new();
        let mut next_id = FIRST_ID;

        if let Some(loaded) = self.file.load::<R>()? {
            for row in loaded.rows {
                index
                    .insert(row)
                    .map_err(|e| self.file.corrupt(e.to_string()))?;
            }
            let after_max = index.max_id().map_or(FIRST_ID, |max| max.saturating_add(1));
            next_id = loaded.header.next_id.max(after_max).max(FIRST_ID);
        }

        tracing::debug!(
            table = R::TABLE_NAME,
            rows = index.len(),
            next_id,
            "table loaded"
        );

        state.index = index;
        state.next_id = next_id;
        state.changes = PendingChanges::default();
        state.loaded = true;
        Ok(())
    }

    /// Write the table if dirty (table lock held); returns whether it wrote
    ///
    /// Pending changes are only cleared once the new file is in place, so a
    /// failed write leaves the table dirty and the cache untouched.
    fn write_locked(&self) -> Result<bool> {
        let (lines, next_id) = {
            let state = self.state.read();
            if !state.loaded || state.changes.is_empty() {
                return Ok(false);
            }
            let lines: Vec<String> = state.index.iter().map(encode_row).collect();
            (lines, state.next_id)
        };

        let bytes = self
            .file
            .write_encoded(R::SCHEMA_VERSION, next_id, &lines)?;
        self.state.write().changes = PendingChanges::default();

        tracing::debug!(
            table = R::TABLE_NAME,
            rows = lines.len(),
            bytes,
            "table flushed"
        );
        Ok(true)
    }

    /// Automatic flush point for `EveryNMutations` (table lock held)
    ///
    /// A failure here is logged and the table stays dirty; the mutation that
    /// triggered it has already succeeded.
    fn after_mutation(&self) {
        if let FlushStrategy::EveryNMutations { count } = self.flush_strategy {
            if self.state.read().changes.mutations >= count {
                if let Err(e) = self.write_locked() {
                    tracing::warn!(table = R::TABLE_NAME, error = %e, "automatic flush failed");
                }
            }
        }
    }
}

impl<R: Row> Drop for TableStore<R> {
    fn drop(&mut self) {
        if !self.flush_on_drop || !self.is_dirty() {
            return;
        }
        if let Err(e) = self.force_write() {
            tracing::error!(table = R::TABLE_NAME, error = %e, "flush on drop failed");
        }
    }
}

impl<R: Row> std::fmt::Debug for TableStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableStore")
            .field("table", &R::TABLE_NAME)
            .field("path", &self.file.path())
            .field("loaded", &self.is_loaded())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

/// Table names become file names: ASCII letters, digits, `_` and `-` only
fn validate_table_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(TextDbError::InvalidArgument(format!(
            "invalid table name '{}'",
            name
        )))
    }
}
