//! Codec Module
//!
//! Converts rows to and from one line of table-file text.
//!
//! ## Line Format
//! ```text
//! <id>|<field 1>|<field 2>|...|<field n>
//!
//! list field:   item;item;item
//! null field:   \N
//! empty item:   \e            (inside a list only)
//! ```
//!
//! Reserved characters inside field text are escaped (see [`escape`]), so a
//! line never contains a raw newline and every `|` or `;` that is not
//! preceded by `\` is a delimiter.
//!
//! ## Schema Growth
//! Fields are positional. A line with fewer fields than the current layout
//! decodes with the missing trailing fields set to their empty value; extra
//! trailing fields are ignored. The id is the only required field.

mod escape;
mod record;

pub use escape::{
    escape, split_unescaped, unescape, EMPTY_ITEM, ESCAPE, FIELD_DELIMITER, LIST_DELIMITER,
    NULL_TOKEN,
};
pub use record::{RecordReader, RecordWriter};

use crate::error::{Result, TextDbError};
use crate::row::Row;

/// Encode a row as one line (without the trailing newline)
pub fn encode_row<R: Row>(row: &R) -> String {
    let mut writer = RecordWriter::new(row.id());
    row.encode_fields(&mut writer);
    writer.finish()
}

/// Decode one line into a row
pub fn decode_row<R: Row>(line: &str) -> Result<R> {
    let tokens = split_unescaped(line, FIELD_DELIMITER)?;
    let id = parse_id(tokens[0])?;

    let mut reader = RecordReader::new(id, &tokens[1..]);
    let mut row = R::decode_fields(&mut reader)?;
    row.set_id(id);

    Ok(row)
}

/// Split a line into unescaped field texts without knowing its row type
///
/// The first element is the id token. Used for inspection and verification.
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    split_unescaped(line, FIELD_DELIMITER)?
        .into_iter()
        .map(|token| {
            if token == NULL_TOKEN {
                Ok(String::new())
            } else {
                unescape(token)
            }
        })
        .collect()
}

/// Parse the leading id token of a line
pub fn parse_id(token: &str) -> Result<i64> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(TextDbError::MalformedRow("missing row id".to_string()));
    }
    trimmed
        .parse::<i64>()
        .map_err(|_| TextDbError::MalformedRow(format!("non-numeric row id '{}'", trimmed)))
}
