//! Error types for vecino.

use thiserror::Error;

/// Errors that can occur while building, persisting, or querying an index.
#[derive(Debug, Error)]
pub enum LshError {
    /// A vector's length disagrees with the index dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A family parameter is out of its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Build was called on a dataset with zero points.
    #[error("empty dataset")]
    EmptyDataset,

    /// A persisted artifact failed validation: bad magic marker, version or
    /// family mismatch, truncated tables, or checksum failure.
    #[error("corrupt artifact: {0}")]
    CorruptArtifact(String),

    /// I/O error at the storage boundary.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for all vecino operations.
pub type Result<T> = std::result::Result<T, LshError>;
