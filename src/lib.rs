//! # textdb
//!
//! An embedded, text-file-backed table store:
//! - One plain-text file per row type, one row per line
//! - Primary-key and declared unique-field indexes held in memory
//! - Per-table reentrant lock with bounded waits
//! - Write-behind persistence with explicit and automatic flush points
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Providers                             │
//! │            (one TableStore per row type, via Database)       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      TableStore                              │
//! │        (select / insert / update / delete / force_write)     │
//! └───────┬─────────────────────┬───────────────────────┬───────┘
//!         │                     │                       │
//!         ▼                     ▼                       ▼
//!  ┌─────────────┐       ┌─────────────┐         ┌─────────────┐
//!  │  TableLock  │       │ TableIndex  │         │  TableFile  │
//!  │ (reentrant, │       │ (id + unique│         │ (header,    │
//!  │   timed)    │       │   indexes)  │         │  rows, CRC) │
//!  └─────────────┘       └─────────────┘         └──────┬──────┘
//!                                                       │
//!                                                ┌──────▼──────┐
//!                                                │    Codec    │
//!                                                │ (Row <-> 1  │
//!                                                │    line)    │
//!                                                └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod row;
pub mod codec;
pub mod index;
pub mod lock;
pub mod storage;
pub mod store;
pub mod database;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use codec::{RecordReader, RecordWriter};
pub use config::{Config, FlushStrategy};
pub use database::Database;
pub use error::{Result, TextDbError};
pub use lock::LockToken;
pub use row::{FieldValue, Row, UniqueKey, UNASSIGNED_ID};
pub use store::{InsertOptions, PendingChanges, TableStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of textdb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
