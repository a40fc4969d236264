//! Error types for FlatDB
//!
//! Provides a unified error type for all operations.
//!
//! Slot indices outside a table's range are programming errors and panic
//! instead of producing a variant here.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using FlatDbError
pub type Result<T> = std::result::Result<T, FlatDbError>;

/// Unified error type for FlatDB operations
#[derive(Debug, Error)]
pub enum FlatDbError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("End of data: needed {needed} bytes, {available} available")]
    EndOfData { needed: usize, available: usize },

    #[error("Value {value} out of range [{min}, {max}]")]
    ValueOutOfRange { value: i128, min: i128, max: i128 },

    // -------------------------------------------------------------------------
    // Lock Errors
    // -------------------------------------------------------------------------
    #[error("Database lock already held: {0}")]
    LockHeld(PathBuf),

    #[error("Database lock was released")]
    LockReleased,

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("Invalid batch reentrancy: a batch is already open")]
    BatchReentrancy,

    #[error("Unmatched batch end: no batch is open")]
    UnmatchedBatchEnd,

    #[error("Malformed log frame at offset {offset}: unknown record type {tag}")]
    MalformedFrame { tag: u32, offset: u64 },

    #[error("Truncated log frame at offset {offset}: {bytes} trailing bytes")]
    TruncatedFrame { offset: u64, bytes: usize },

    // -------------------------------------------------------------------------
    // Table Errors
    // -------------------------------------------------------------------------
    #[error("Table size error: {0}")]
    TableSize(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FlatDbError {
    /// Build a range error from any integer bounds
    pub(crate) fn out_of_range(value: impl Into<i128>, min: impl Into<i128>, max: impl Into<i128>) -> Self {
        FlatDbError::ValueOutOfRange {
            value: value.into(),
            min: min.into(),
            max: max.into(),
        }
    }
}
