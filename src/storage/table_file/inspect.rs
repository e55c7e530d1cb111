//! Table File Inspection
//!
//! Type-agnostic view of a table file for diagnostics.

use std::collections::HashSet;

use crate::codec::{parse_id, tokenize};
use crate::error::Result;

use super::{TableFile, TableHeader};

/// One undecoded row line
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// 1-based line number in the file
    pub line: usize,
    pub text: String,
}

impl RawRecord {
    pub fn id(&self) -> Result<i64> {
        let end = self.text.find('|').unwrap_or(self.text.len());
        parse_id(&self.text[..end])
    }

    /// Unescaped field texts, id first
    pub fn fields(&self) -> Result<Vec<String>> {
        tokenize(&self.text)
    }
}

/// Result of inspecting a table file
#[derive(Debug)]
pub struct Inspection {
    pub header: TableHeader,
    pub records: Vec<RawRecord>,
    pub stored_crc: Option<u32>,
    pub computed_crc: u32,
}

impl Inspection {
    /// Everything wrong with the file; empty when it would load cleanly
    /// (field types aside, which need the row type)
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        match self.stored_crc {
            None => problems.push("missing #END trailer".to_string()),
            Some(stored) if stored != self.computed_crc => problems.push(format!(
                "checksum mismatch: stored {:08x}, computed {:08x}",
                stored, self.computed_crc
            )),
            Some(_) => {}
        }

        if self.header.row_count != self.records.len() {
            problems.push(format!(
                "header declares {} rows, file contains {}",
                self.header.row_count,
                self.records.len()
            ));
        }

        let mut seen = HashSet::new();
        for record in &self.records {
            match record.id() {
                Ok(id) => {
                    if !seen.insert(id) {
                        problems.push(format!("line {}: duplicate id {}", record.line, id));
                    } else if id >= self.header.next_id {
                        problems.push(format!(
                            "line {}: id {} is not below next id {}",
                            record.line, id, self.header.next_id
                        ));
                    }
                }
                Err(e) => problems.push(format!("line {}: {}", record.line, e)),
            }
            if let Err(e) = record.fields() {
                problems.push(format!("line {}: {}", record.line, e));
            }
        }

        problems
    }

    pub fn is_valid(&self) -> bool {
        self.problems().is_empty()
    }
}

impl TableFile {
    /// Read the file without decoding rows
    pub fn inspect(&self) -> Result<Inspection> {
        let raw = self
            .read_raw()?
            .ok_or_else(|| self.corrupt("file is missing or empty"))?;
        let computed_crc = raw.computed_crc();

        Ok(Inspection {
            header: raw.header,
            records: raw
                .records
                .into_iter()
                .map(|(line, text)| RawRecord { line, text })
                .collect(),
            stored_crc: raw.stored_crc,
            computed_crc,
        })
    }
}
