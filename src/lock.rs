//! Table Lock
//!
//! Per-table reentrant lock with a bounded wait.
//!
//! ## Concurrency Model
//! - One `TableLock` per table; tables never contend with each other
//! - Every structural mutation of a table (insert/update/delete/truncate,
//!   lazy load, flush) runs while holding it
//! - Callers may hold it themselves (`TableStore::table_lock`) to make a
//!   read-modify-write sequence atomic; the store's own mutators re-enter
//!   it on the same thread
//! - Waiting is bounded: a timeout is reported as `LockTimeout`

use std::time::{Duration, Instant};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::error::{Result, TextDbError};

/// Reentrant, timed mutual exclusion for one table
pub struct TableLock {
    table: &'static str,
    mutex: ReentrantMutex<()>,
    timeout: Duration,
}

/// Scoped handle on a [`TableLock`]
///
/// Released when dropped, on every exit path.
#[must_use = "the table is unlocked as soon as the token is dropped"]
pub struct LockToken<'a> {
    table: &'static str,
    _guard: ReentrantMutexGuard<'a, ()>,
}

impl TableLock {
    pub fn new(table: &'static str, timeout: Duration) -> Self {
        Self {
            table,
            mutex: ReentrantMutex::new(()),
            timeout,
        }
    }

    /// Acquire with the configured timeout
    pub fn acquire(&self) -> Result<LockToken<'_>> {
        self.acquire_for(self.timeout)
    }

    /// Acquire, waiting at most `timeout`
    pub fn acquire_for(&self, timeout: Duration) -> Result<LockToken<'_>> {
        let started = Instant::now();
        match self.mutex.try_lock_for(timeout) {
            Some(guard) => Ok(LockToken {
                table: self.table,
                _guard: guard,
            }),
            None => {
                let waited_ms = started.elapsed().as_millis() as u64;
                tracing::warn!(table = self.table, waited_ms, "table lock timed out");
                Err(TextDbError::LockTimeout {
                    table: self.table.to_string(),
                    waited_ms,
                })
            }
        }
    }

    /// True if any thread currently holds the lock
    pub fn is_locked(&self) -> bool {
        self.mutex.is_locked()
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl LockToken<'_> {
    /// Table this token locks
    pub fn table(&self) -> &'static str {
        self.table
    }
}

impl std::fmt::Debug for TableLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableLock")
            .field("table", &self.table)
            .field("timeout", &self.timeout)
            .field("locked", &self.is_locked())
            .finish()
    }
}
