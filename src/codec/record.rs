//! Record writer and reader
//!
//! Field-level access to one encoded row. The writer escapes as it goes;
//! the reader keeps the raw tokens of the line and unescapes on demand.

use crate::error::{Result, TextDbError};
use crate::row::FieldValue;

use super::escape::{
    escape, split_unescaped, unescape, EMPTY_ITEM, FIELD_DELIMITER, LIST_DELIMITER, NULL_TOKEN,
};

/// Collects the fields of one row in schema order
#[derive(Debug)]
pub struct RecordWriter {
    fields: Vec<String>,
}

impl RecordWriter {
    pub(crate) fn new(id: i64) -> Self {
        Self {
            fields: vec![id.to_string()],
        }
    }

    /// Append a scalar field
    pub fn field<T: FieldValue>(&mut self, value: &T) -> &mut Self {
        self.fields.push(escape(&value.to_field()));
        self
    }

    /// Append a text field
    pub fn text(&mut self, value: &str) -> &mut Self {
        self.fields.push(escape(value));
        self
    }

    /// Append a field that may be absent
    pub fn optional<T: FieldValue>(&mut self, value: Option<&T>) -> &mut Self {
        match value {
            Some(v) => self.field(v),
            None => {
                self.fields.push(NULL_TOKEN.to_string());
                self
            }
        }
    }

    /// Append an enumeration by its integer discriminant
    pub fn enumeration<E: Copy + Into<i32>>(&mut self, value: E) -> &mut Self {
        let discriminant: i32 = value.into();
        self.field(&discriminant)
    }

    /// Append a repeated value as one `;`-joined field
    pub fn list<T: FieldValue>(&mut self, items: &[T]) -> &mut Self {
        let joined = items
            .iter()
            .map(|item| {
                let text = item.to_field();
                if text.is_empty() {
                    EMPTY_ITEM.to_string()
                } else {
                    escape(&text)
                }
            })
            .collect::<Vec<_>>()
            .join(&LIST_DELIMITER.to_string());
        self.fields.push(joined);
        self
    }

    /// Number of fields written so far, id included
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn finish(self) -> String {
        self.fields.join(&FIELD_DELIMITER.to_string())
    }
}

/// Sequential access to the fields of one decoded line
#[derive(Debug)]
pub struct RecordReader<'a> {
    id: i64,
    tokens: &'a [&'a str],
    position: usize,
}

impl<'a> RecordReader<'a> {
    pub(crate) fn new(id: i64, tokens: &'a [&'a str]) -> Self {
        Self {
            id,
            tokens,
            position: 0,
        }
    }

    /// Id of the row being decoded
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Read the next scalar field; missing, empty or null reads as empty
    pub fn field<T: FieldValue>(&mut self) -> Result<T> {
        let index = self.position;
        match self.next_token() {
            None => Ok(T::empty()),
            Some(token) if token.is_empty() || token == NULL_TOKEN => Ok(T::empty()),
            Some(token) => self.parse(index, token),
        }
    }

    /// Read the next scalar field, using `default` when it is missing
    pub fn field_or<T: FieldValue>(&mut self, default: T) -> Result<T> {
        if self.position >= self.tokens.len() {
            self.position += 1;
            return Ok(default);
        }
        self.field()
    }

    /// Read the next text field
    pub fn text(&mut self) -> Result<String> {
        self.field::<String>()
    }

    /// Read a field written with [`RecordWriter::optional`]
    pub fn optional<T: FieldValue>(&mut self) -> Result<Option<T>> {
        let index = self.position;
        match self.next_token() {
            None => Ok(None),
            Some(token) if token == NULL_TOKEN => Ok(None),
            Some("") => Ok(Some(T::empty())),
            Some(token) => self.parse(index, token).map(Some),
        }
    }

    /// Read an enumeration discriminant; missing reads as `E::default()`
    pub fn enumeration<E: TryFrom<i32> + Default>(&mut self) -> Result<E> {
        let index = self.position;
        match self.next_token() {
            None => Ok(E::default()),
            Some(token) if token.is_empty() || token == NULL_TOKEN => Ok(E::default()),
            Some(token) => {
                let discriminant: i32 = self.parse(index, token)?;
                E::try_from(discriminant).map_err(|_| {
                    TextDbError::MalformedRow(format!(
                        "field #{}: unknown enumeration value {}",
                        index + 1,
                        discriminant
                    ))
                })
            }
        }
    }

    /// Read a field written with [`RecordWriter::list`]
    pub fn list<T: FieldValue>(&mut self) -> Result<Vec<T>> {
        let index = self.position;
        let token = match self.next_token() {
            None => return Ok(Vec::new()),
            Some(token) if token.is_empty() || token == NULL_TOKEN => return Ok(Vec::new()),
            Some(token) => token,
        };

        split_unescaped(token, LIST_DELIMITER)?
            .into_iter()
            .map(|item| {
                if item == EMPTY_ITEM {
                    return Ok(T::empty());
                }
                let text = unescape(item)?;
                T::from_field(&text).map_err(|reason| {
                    TextDbError::MalformedRow(format!("field #{}: {}", index + 1, reason))
                })
            })
            .collect()
    }

    /// Fields not yet read (written by a newer schema, or simply unread)
    pub fn remaining(&self) -> usize {
        self.tokens.len().saturating_sub(self.position)
    }

    fn next_token(&mut self) -> Option<&'a str> {
        let token = self.tokens.get(self.position).copied();
        self.position += 1;
        token
    }

    fn parse<T: FieldValue>(&self, index: usize, token: &str) -> Result<T> {
        let text = unescape(token)?;
        T::from_field(&text).map_err(|reason| {
            TextDbError::MalformedRow(format!("field #{}: {}", index + 1, reason))
        })
    }
}
