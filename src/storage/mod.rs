//! Storage Module
//!
//! Durable counterpart of a table: one text file per row type.
//!
//! ## Responsibilities
//! - Header with format/schema version and the id allocator position
//! - One encoded row per line, in id order
//! - CRC32 trailer over the row section to detect damaged files
//! - Atomic whole-file rewrite (temp file + fsync + rename)
//! - Raw inspection without a row type (used by the CLI)
//!
//! ## File Format (V1)
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ #TEXTDB|<format>|<table>|<schema>|<next_id>|<row_count>      │
//! ├──────────────────────────────────────────────────────────────┤
//! │ <id>|<field>|<field>|...                                     │
//! │ ... (one line per row, ascending id)                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │ #END|<crc32 of the row lines, hex>                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod table_file;

pub use table_file::{Inspection, LoadedTable, RawRecord, TableFile, TableHeader};
