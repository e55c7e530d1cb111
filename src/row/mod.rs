//! Row Module
//!
//! The contract every stored record satisfies.
//!
//! ## Responsibilities
//! - Identity: a 64-bit id, `0` while unassigned
//! - Field layout: a fixed, versioned field order written through
//!   [`RecordWriter`] and read back through [`RecordReader`]
//! - Declared unique fields, enforced by the index
//! - A validation hook run before any lock or disk access
//!
//! Rows are plain values. The store never hands out references into its
//! cache: an update replaces the stored value, and whether anything changed
//! is decided by comparing the old and new values.

mod field;

use std::fmt;

use crate::codec::{RecordReader, RecordWriter};
use crate::error::Result;

pub use field::{FieldValue, Ticks, TICKS_PER_SECOND, UNIX_EPOCH_TICKS};

/// Id carried by a row that has not been inserted yet
pub const UNASSIGNED_ID: i64 = 0;

/// A typed, identity-bearing record stored in one table
pub trait Row: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Table (and file) name for this row type
    const TABLE_NAME: &'static str;

    /// Version of the field layout written by `encode_fields`
    const SCHEMA_VERSION: u32 = 1;

    fn id(&self) -> i64;

    fn set_id(&mut self, id: i64);

    /// Write every field except the id, in schema order
    fn encode_fields(&self, out: &mut RecordWriter);

    /// Read the fields written by `encode_fields`
    ///
    /// Fields missing from the end of the record read as their empty value,
    /// so appending a field to the layout keeps older files loadable.
    fn decode_fields(fields: &mut RecordReader<'_>) -> Result<Self>;

    /// Values that must be unique across the table
    fn unique_keys(&self) -> Vec<UniqueKey> {
        Vec::new()
    }

    /// Reject rows that can never be stored (for example an empty key)
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// One declared unique field value of a row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniqueKey {
    pub field: &'static str,
    pub value: String,
}

impl UniqueKey {
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}
