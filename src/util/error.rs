//! Error types for the simarch library.

use std::path::PathBuf;
use thiserror::Error;

use super::Dtype;

/// Main error type for archive operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Output archive already exists (exclusive-create pre-flight)
    #[error("Output archive already exists: {0}")]
    TargetExists(PathBuf),

    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid magic bytes at start of file
    #[error("Invalid archive file: bad magic bytes")]
    InvalidMagic,

    /// Unsupported container format version
    #[error("Unsupported archive version: {0}")]
    UnsupportedVersion(u32),

    /// File is truncated or corrupted
    #[error("Unexpected end of file at position {0}")]
    UnexpectedEof(u64),

    /// Invalid data structure in file
    #[error("Invalid archive structure: {0}")]
    InvalidStructure(String),

    /// Node not found by path
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Path resolves to a group where a dataset was expected
    #[error("Not a dataset: {0}")]
    NotADataset(String),

    /// Node already exists at the target path
    #[error("Node already exists: {0}")]
    NodeExists(String),

    /// Element type mismatch when writing rows
    #[error("Dtype mismatch: expected {expected}, got {actual}")]
    DtypeMismatch { expected: Dtype, actual: Dtype },

    /// Row index out of bounds
    #[error("Row {row} out of bounds for {path} ({rows} rows)")]
    RowOutOfBounds { path: String, row: u64, rows: u64 },

    /// Stored block checksum does not match its contents
    #[error("Checksum mismatch in {path}, block {block}")]
    ChecksumMismatch { path: String, block: usize },

    /// Index (de)serialization error
    #[error("Archive index error: {0}")]
    Index(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }
}

/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;
