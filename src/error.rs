//! Error types for hashchain
//!
//! Provides a unified error type for all chain operations.

use thiserror::Error;

/// Result type alias using ChainError
pub type Result<T> = std::result::Result<T, ChainError>;

/// Boxed error returned by iteration visitors
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unified error type for hashchain operations
#[derive(Debug, Error)]
pub enum ChainError {
    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("hashchain: not found")]
    NotFound,

    #[error("hashchain: log not initialized")]
    LogNotInitialized,

    // -------------------------------------------------------------------------
    // Integrity Errors
    // -------------------------------------------------------------------------
    #[error("hashchain: integrity check failed for record {id}")]
    Integrity { id: u64 },

    #[error("hashchain: store length {len} is not a multiple of record size {record_size}")]
    Truncated { len: u64, record_size: u64 },

    // -------------------------------------------------------------------------
    // Message Errors
    // -------------------------------------------------------------------------
    #[error("hashchain: invalid message size {actual}, expected {expected}")]
    InvalidMessageSize { expected: usize, actual: usize },

    #[error("hashchain: incomplete write, encoded {written} of {expected} bytes")]
    IncompleteWrite { expected: usize, written: usize },

    #[error("hashchain: codec error: {0}")]
    Codec(String),

    #[error("hashchain: record {id} could not be decoded: {source}")]
    Decode {
        id: u64,
        #[source]
        source: Box<ChainError>,
    },

    #[error("hashchain: digest buffer is {actual} bytes, hash function produces {expected}")]
    DigestSize { expected: usize, actual: usize },

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("hashchain: incomplete read at offset {offset}, got {actual} of {expected} bytes")]
    IncompleteRead {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    #[error("hashchain: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Iteration Errors
    // -------------------------------------------------------------------------
    #[error("hashchain: record {id} visitor failed: {source}")]
    Visit {
        id: u64,
        #[source]
        source: BoxError,
    },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("hashchain: configuration error: {0}")]
    Config(String),
}

impl ChainError {
    /// Wrap an I/O error with the operation that produced it
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ChainError::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether the error signals a broken chain rather than a missing record
    pub fn is_integrity(&self) -> bool {
        matches!(self, ChainError::Integrity { .. })
    }

    /// Whether the error signals a missing record
    pub fn is_not_found(&self) -> bool {
        matches!(self, ChainError::NotFound)
    }
}
