//! Delimiter escaping
//!
//! Field content may contain any character. The reserved characters are
//! written as two-character escapes so that a row always occupies exactly
//! one line and splits unambiguously on its delimiters.
//!
//! | Character | Escape |
//! |-----------|--------|
//! | `\`       | `\\`   |
//! | `\|`      | `\|`   |
//! | `;`       | `\;`   |
//! | LF        | `\n`   |
//! | CR        | `\r`   |

use crate::error::{Result, TextDbError};

/// Separates the fields of one row
pub const FIELD_DELIMITER: char = '|';

/// Separates the items of a list field
pub const LIST_DELIMITER: char = ';';

/// Escape introducer
pub const ESCAPE: char = '\\';

/// A whole token with this content is a null (absent optional value)
pub const NULL_TOKEN: &str = "\\N";

/// A whole list item with this content is an empty string
pub const EMPTY_ITEM: &str = "\\e";

/// Escape every reserved character in `input`
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '|' => out.push_str("\\|"),
            ';' => out.push_str("\\;"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

/// Reverse [`escape`]
///
/// The empty-item marker `\e` unescapes to nothing.
pub fn unescape(input: &str) -> Result<String> {
    if !input.contains(ESCAPE) {
        return Ok(input.to_string());
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch != ESCAPE {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('|') => out.push('|'),
            Some(';') => out.push(';'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('e') => {}
            Some(other) => {
                return Err(TextDbError::MalformedRow(format!(
                    "unsupported escape sequence '\\{}'",
                    other
                )))
            }
            None => {
                return Err(TextDbError::MalformedRow(
                    "dangling escape at end of token".to_string(),
                ))
            }
        }
    }
    Ok(out)
}

/// Split `input` on every `delimiter` that is not escaped
///
/// The returned slices are still escaped. An input always yields at least
/// one (possibly empty) slice.
pub fn split_unescaped(input: &str, delimiter: char) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut chars = input.char_indices();

    while let Some((pos, ch)) = chars.next() {
        if ch == ESCAPE {
            if chars.next().is_none() {
                return Err(TextDbError::MalformedRow(
                    "dangling escape at end of line".to_string(),
                ));
            }
        } else if ch == delimiter {
            parts.push(&input[start..pos]);
            start = pos + ch.len_utf8();
        }
    }
    parts.push(&input[start..]);

    Ok(parts)
}
