//! Table File Module
//!
//! Reading, writing and inspecting one table file.

mod inspect;
mod reader;
mod writer;

use std::path::{Path, PathBuf};

use crate::codec::{split_unescaped, FIELD_DELIMITER};
use crate::error::{Result, TextDbError};

pub use inspect::{Inspection, RawRecord};
pub use reader::LoadedTable;

// =============================================================================
// Shared Constants (used by reader, writer, inspect)
// =============================================================================

/// First token of the header line
pub(crate) const MAGIC: &str = "#TEXTDB";

/// First token of the trailer line
pub(crate) const TRAILER_TAG: &str = "#END";

/// Current table file format version
pub(crate) const FORMAT_VERSION: u32 = 1;

/// Extension of table files
pub(crate) const FILE_EXTENSION: &str = "tbl";

/// Extension of the temporary file written during a flush
pub(crate) const TEMP_EXTENSION: &str = "tbl.tmp";

// =============================================================================
// Header
// =============================================================================

/// Parsed header line of a table file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHeader {
    pub format_version: u32,
    pub table: String,
    pub schema_version: u32,
    /// Next id the allocator hands out
    pub next_id: i64,
    pub row_count: usize,
}

impl TableHeader {
    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            MAGIC,
            self.format_version,
            crate::codec::escape(&self.table),
            self.schema_version,
            self.next_id,
            self.row_count
        )
    }

    /// Parse a header line; `table` names the file in error messages
    pub fn parse(line: &str, table: &str) -> Result<Self> {
        let corrupt = |reason: String| TextDbError::CorruptTable {
            table: table.to_string(),
            reason,
        };

        let tokens = split_unescaped(line, FIELD_DELIMITER)?;
        if tokens.first() != Some(&MAGIC) {
            return Err(corrupt("missing #TEXTDB header".to_string()));
        }
        if tokens.len() != 6 {
            return Err(corrupt(format!(
                "header has {} fields, expected 6",
                tokens.len()
            )));
        }

        let format_version: u32 = tokens[1]
            .parse()
            .map_err(|_| corrupt(format!("invalid format version '{}'", tokens[1])))?;
        if format_version != FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {}",
                format_version
            )));
        }

        Ok(Self {
            format_version,
            table: crate::codec::unescape(tokens[2])?,
            schema_version: tokens[3]
                .parse()
                .map_err(|_| corrupt(format!("invalid schema version '{}'", tokens[3])))?,
            next_id: tokens[4]
                .parse()
                .map_err(|_| corrupt(format!("invalid next id '{}'", tokens[4])))?,
            row_count: tokens[5]
                .parse()
                .map_err(|_| corrupt(format!("invalid row count '{}'", tokens[5])))?,
        })
    }
}

// =============================================================================
// Table File Handle
// =============================================================================

/// Location of one table's file
#[derive(Debug, Clone)]
pub struct TableFile {
    path: PathBuf,
    table: String,
}

impl TableFile {
    /// File for `table` inside `data_dir`
    pub fn new(data_dir: &Path, table: &str) -> Self {
        Self {
            path: data_dir.join(format!("{}.{}", table, FILE_EXTENSION)),
            table: table.to_string(),
        }
    }

    /// File at an explicit path; the table name is taken from the file stem
    pub fn at(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let table = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, table }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Path of the temporary file used while flushing
    pub fn temp_path(&self) -> PathBuf {
        self.path.with_extension(TEMP_EXTENSION)
    }

    pub(crate) fn corrupt(&self, reason: impl Into<String>) -> TextDbError {
        TextDbError::CorruptTable {
            table: self.table.clone(),
            reason: reason.into(),
        }
    }
}

/// CRC32 of the row section: each line followed by `\n`
pub(crate) fn row_section_crc<'a>(lines: impl IntoIterator<Item = &'a str>) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize()
}
