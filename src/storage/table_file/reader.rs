//! Table File Reader
//!
//! Loads a table file into rows, validating header, trailer and CRC.

use std::fs;
use std::io::ErrorKind;

use crate::codec::decode_row;
use crate::error::{Result, TextDbError};
use crate::row::Row;

use super::{row_section_crc, TableFile, TableHeader, MAGIC, TRAILER_TAG};

/// Rows and header of a successfully loaded table file
#[derive(Debug)]
pub struct LoadedTable<R> {
    pub header: TableHeader,
    pub rows: Vec<R>,
}

/// Undecoded content of a table file
#[derive(Debug)]
pub(crate) struct RawTable {
    pub header: TableHeader,
    /// (1-based line number, line text)
    pub records: Vec<(usize, String)>,
    /// CRC recorded in the trailer; `None` if the trailer is missing
    pub stored_crc: Option<u32>,
}

impl RawTable {
    pub fn computed_crc(&self) -> u32 {
        row_section_crc(self.records.iter().map(|(_, line)| line.as_str()))
    }
}

impl TableFile {
    /// Load and decode every row
    ///
    /// Returns `Ok(None)` when the file does not exist (a table that was
    /// never flushed).
    pub fn load<R: Row>(&self) -> Result<Option<LoadedTable<R>>> {
        let raw = match self.read_raw()? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        if raw.header.table != R::TABLE_NAME {
            return Err(self.corrupt(format!(
                "file belongs to table '{}'",
                raw.header.table
            )));
        }

        let stored_crc = raw
            .stored_crc
            .ok_or_else(|| self.corrupt("missing #END trailer (truncated file?)"))?;
        let computed_crc = raw.computed_crc();
        if stored_crc != computed_crc {
            return Err(self.corrupt(format!(
                "checksum mismatch: stored {:08x}, computed {:08x}",
                stored_crc, computed_crc
            )));
        }

        if raw.header.row_count != raw.records.len() {
            return Err(self.corrupt(format!(
                "header declares {} rows, file contains {}",
                raw.header.row_count,
                raw.records.len()
            )));
        }

        if raw.header.schema_version < R::SCHEMA_VERSION {
            tracing::debug!(
                table = R::TABLE_NAME,
                file_schema = raw.header.schema_version,
                current_schema = R::SCHEMA_VERSION,
                "loading older schema, missing trailing fields take empty values"
            );
        } else if raw.header.schema_version > R::SCHEMA_VERSION {
            tracing::warn!(
                table = R::TABLE_NAME,
                file_schema = raw.header.schema_version,
                current_schema = R::SCHEMA_VERSION,
                "loading newer schema, unknown trailing fields are ignored"
            );
        }

        let mut rows = Vec::with_capacity(raw.records.len());
        for (line_no, line) in &raw.records {
            let row = decode_row::<R>(line).map_err(|e| match e {
                TextDbError::MalformedRow(reason) => TextDbError::MalformedRow(format!(
                    "{} line {}: {}",
                    self.path().display(),
                    line_no,
                    reason
                )),
                other => other,
            })?;
            rows.push(row);
        }

        Ok(Some(LoadedTable {
            header: raw.header,
            rows,
        }))
    }

    /// Split the file into header, row lines and trailer
    ///
    /// `Ok(None)` for a missing or zero-length file.
    pub(crate) fn read_raw(&self) -> Result<Option<RawTable>> {
        let content = match fs::read_to_string(self.path()) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if content.is_empty() {
            tracing::debug!(path = %self.path().display(), "table file is empty");
            return Ok(None);
        }

        let mut lines = content.lines().enumerate();
        let header = match lines.next() {
            Some((_, line)) if line.starts_with(MAGIC) => TableHeader::parse(line, self.table())?,
            _ => return Err(self.corrupt("missing #TEXTDB header")),
        };

        let mut records = Vec::new();
        let mut stored_crc = None;
        for (index, line) in lines {
            if stored_crc.is_some() {
                return Err(self.corrupt(format!("content after trailer at line {}", index + 1)));
            }
            if let Some(rest) = line.strip_prefix(TRAILER_TAG) {
                let hex = rest.strip_prefix('|').unwrap_or(rest);
                let crc = u32::from_str_radix(hex.trim(), 16)
                    .map_err(|_| self.corrupt(format!("invalid trailer '{}'", line)))?;
                stored_crc = Some(crc);
                continue;
            }
            records.push((index + 1, line.to_string()));
        }

        Ok(Some(RawTable {
            header,
            records,
            stored_crc,
        }))
    }
}
