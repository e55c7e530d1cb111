//! Database Module
//!
//! Owns one [`TableStore`] per row type inside a data directory.
//!
//! ## Responsibilities
//! - Hand out the single store instance for a row type
//! - Flush every table on demand and on close
//! - Run the background flusher for `FlushStrategy::Interval`

use std::any::{Any, TypeId};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::config::{Config, FlushStrategy};
use crate::error::{Result, TextDbError};
use crate::row::Row;
use crate::store::TableStore;

/// Type-erased flush access to a store
trait FlushTarget: Send + Sync {
    fn table_name(&self) -> &'static str;
    fn flush_if_dirty(&self) -> Result<bool>;
    fn force_write(&self) -> Result<()>;
}

impl<R: Row> FlushTarget for TableStore<R> {
    fn table_name(&self) -> &'static str {
        TableStore::table_name(self)
    }

    fn flush_if_dirty(&self) -> Result<bool> {
        TableStore::flush_if_dirty(self)
    }

    fn force_write(&self) -> Result<()> {
        TableStore::force_write(self)
    }
}

struct Entry {
    type_id: TypeId,
    store: Arc<dyn Any + Send + Sync>,
    flush: Arc<dyn FlushTarget>,
}

/// Stores opened so far, shared with the flusher thread
#[derive(Default)]
struct Registry {
    tables: Mutex<Vec<Entry>>,
}

impl Registry {
    fn targets(&self) -> Vec<Arc<dyn FlushTarget>> {
        self.tables.lock().iter().map(|e| Arc::clone(&e.flush)).collect()
    }

    /// Background pass: failures are logged and retried on the next tick
    fn flush_dirty(&self) {
        for target in self.targets() {
            match target.flush_if_dirty() {
                Ok(true) => tracing::trace!(table = target.table_name(), "background flush"),
                Ok(false) => {}
                Err(e) => tracing::warn!(
                    table = target.table_name(),
                    error = %e,
                    "background flush failed"
                ),
            }
        }
    }
}

/// Handle on the background flush thread
struct Flusher {
    shutdown: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Flusher {
    fn spawn(registry: Arc<Registry>, interval: Duration) -> Result<Self> {
        let (shutdown, shutdown_rx) = channel::bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("textdb-flusher".to_string())
            .spawn(move || loop {
                match shutdown_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => registry.flush_dirty(),
                    // Shutdown requested or the database is gone
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        tracing::debug!(interval_ms = interval.as_millis() as u64, "background flusher started");

        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    fn stop(&mut self) {
        let _ = self.shutdown.try_send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("background flusher panicked");
            }
        }
    }
}

/// A data directory holding one table per row type
///
/// Construct once and share it (or the stores it hands out) with the code
/// that needs tables; there is no process-wide instance.
pub struct Database {
    config: Config,
    registry: Arc<Registry>,
    flusher: Option<Flusher>,
}

impl Database {
    /// Open or create the data directory described by `config`
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let registry = Arc::new(Registry::default());
        let flusher = match config.flush_strategy {
            FlushStrategy::Interval { ms } => Some(Flusher::spawn(
                Arc::clone(&registry),
                Duration::from_millis(ms),
            )?),
            _ => None,
        };

        tracing::info!(data_dir = %config.data_dir.display(), "database opened");

        Ok(Self {
            config,
            registry,
            flusher,
        })
    }

    /// Open with a path (convenience method)
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// The store for row type `R`, created on first request
    ///
    /// Every call for the same `R` returns the same instance.
    pub fn table<R: Row>(&self) -> Result<Arc<TableStore<R>>> {
        let mut tables = self.registry.tables.lock();

        if let Some(entry) = tables.iter().find(|e| e.type_id == TypeId::of::<R>()) {
            return Arc::clone(&entry.store)
                .downcast::<TableStore<R>>()
                .map_err(|_| {
                    TextDbError::InvalidArgument(format!(
                        "registry entry for '{}' has the wrong type",
                        R::TABLE_NAME
                    ))
                });
        }

        if tables.iter().any(|e| e.flush.table_name() == R::TABLE_NAME) {
            return Err(TextDbError::InvalidArgument(format!(
                "table name '{}' is already used by another row type",
                R::TABLE_NAME
            )));
        }

        let store = Arc::new(TableStore::<R>::open_managed(&self.config)?);
        tables.push(Entry {
            type_id: TypeId::of::<R>(),
            store: Arc::clone(&store) as Arc<dyn Any + Send + Sync>,
            flush: Arc::clone(&store) as Arc<dyn FlushTarget>,
        });

        Ok(store)
    }

    /// Names of the tables opened so far
    pub fn table_names(&self) -> Vec<&'static str> {
        self.registry
            .tables
            .lock()
            .iter()
            .map(|e| e.flush.table_name())
            .collect()
    }

    /// Write every dirty table
    ///
    /// All tables are attempted; the first error is returned.
    pub fn flush_all(&self) -> Result<()> {
        let mut first_error = None;
        for target in self.registry.targets() {
            if let Err(e) = target.force_write() {
                tracing::error!(table = target.table_name(), error = %e, "flush failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Stop the background flusher and flush every table
    pub fn close(mut self) -> Result<()> {
        if let Some(mut flusher) = self.flusher.take() {
            flusher.stop();
        }
        self.flush_all()
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Some(mut flusher) = self.flusher.take() {
            flusher.stop();
        }
    }
}
