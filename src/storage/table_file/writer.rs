//! Table File Writer
//!
//! Rewrites a whole table file atomically.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::codec::encode_row;
use crate::error::{Result, TextDbError};
use crate::row::Row;

use super::{row_section_crc, TableFile, TableHeader, FORMAT_VERSION, TRAILER_TAG};

impl TableFile {
    /// Encode and write `rows` (expected in id order)
    ///
    /// Returns the size of the new file in bytes.
    pub fn write<'a, R: Row>(
        &self,
        rows: impl IntoIterator<Item = &'a R>,
        next_id: i64,
    ) -> Result<u64> {
        let lines: Vec<String> = rows.into_iter().map(encode_row).collect();
        self.write_encoded(R::SCHEMA_VERSION, next_id, &lines)
    }

    /// Write already-encoded row lines
    ///
    /// The previous file stays intact until the new one is fully on disk:
    /// content goes to `<name>.tbl.tmp`, is fsynced, then renamed over the
    /// target.
    pub fn write_encoded(&self, schema_version: u32, next_id: i64, lines: &[String]) -> Result<u64> {
        let header = TableHeader {
            format_version: FORMAT_VERSION,
            table: self.table().to_string(),
            schema_version,
            next_id,
            row_count: lines.len(),
        };

        let temp_path = self.temp_path();
        let result = write_temp(&temp_path, &header, lines)
            .and_then(|size| {
                fs::rename(&temp_path, self.path())?;
                Ok(size)
            });

        match result {
            Ok(size) => {
                if let Some(dir) = self.path().parent() {
                    sync_dir(dir);
                }
                Ok(size)
            }
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }
}

fn write_temp(path: &Path, header: &TableHeader, lines: &[String]) -> Result<u64> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "{}", header.to_line())?;
    for line in lines {
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    let crc = row_section_crc(lines.iter().map(String::as_str));
    writeln!(writer, "{}|{:08x}", TRAILER_TAG, crc)?;

    let file = writer.into_inner().map_err(|e| {
        TextDbError::Io(e.into_error())
    })?;
    file.sync_all()?;

    Ok(file.metadata()?.len())
}

/// Persist the rename itself; best effort, not every platform supports it
fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    {
        if let Ok(handle) = File::open(dir) {
            let _ = handle.sync_all();
        }
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
}
