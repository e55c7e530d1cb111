//! Error types for textdb
//!
//! Provides a unified error type for all table operations.

use thiserror::Error;

/// Result type alias using TextDbError
pub type Result<T> = std::result::Result<T, TextDbError>;

/// Unified error type for textdb operations
#[derive(Debug, Error)]
pub enum TextDbError {
    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Table file for '{table}' is corrupt: {reason}")]
    CorruptTable { table: String, reason: String },

    // -------------------------------------------------------------------------
    // Validation Errors
    // -------------------------------------------------------------------------
    #[error("Row {id} not found in table '{table}'")]
    RowNotFound { table: String, id: i64 },

    #[error("Row id {id} already exists in table '{table}'")]
    DuplicateId { table: String, id: i64 },

    #[error("Unique constraint on '{table}.{field}' violated by value '{value}'")]
    UniqueConstraintViolation {
        table: String,
        field: String,
        value: String,
    },

    #[error("Malformed row: {0}")]
    MalformedRow(String),

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Timed out after {waited_ms}ms waiting for lock on table '{table}'")]
    LockTimeout { table: String, waited_ms: u64 },

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TextDbError {
    /// Caller-correctable rejections that left the table untouched.
    ///
    /// Providers translate these into business-rule messages
    /// ("code already exists") instead of failing the request.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TextDbError::DuplicateId { .. }
                | TextDbError::UniqueConstraintViolation { .. }
                | TextDbError::MalformedRow(_)
        )
    }

    /// Calls that could never succeed as made: invalid arguments or rows,
    /// updates of rows that do not exist, unusable configuration.
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            TextDbError::InvalidArgument(_)
                | TextDbError::RowNotFound { .. }
                | TextDbError::Config(_)
        )
    }

    /// Contention failures that may succeed if the caller tries again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TextDbError::LockTimeout { .. })
    }
}
