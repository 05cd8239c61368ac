//! Error types for ShelfDB
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using ShelfError
pub type Result<T> = std::result::Result<T, ShelfError>;

/// Unified error type for ShelfDB operations
#[derive(Debug, Error)]
pub enum ShelfError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error at {path}: {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Persisted Data Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt data in {path}{}: {message}", line_suffix(.line))]
    Corrupt {
        path: PathBuf,
        line: Option<usize>,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Could not find record with id \"{id}\" in store \"{store}\"")]
    NotFound { store: String, id: String },

    #[error("Record id mismatch: expected \"{expected}\", found \"{found}\"")]
    IdMismatch { expected: String, found: String },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Validation failed for store \"{store}\": {message}")]
    Validation { store: String, message: String },

    // -------------------------------------------------------------------------
    // Store Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Store \"{store}\" is unavailable: {reason}")]
    StoreUnavailable { store: String, reason: String },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Worker thread panicked: {0}")]
    WorkerPanicked(String),
}

impl ShelfError {
    /// Create a file I/O error with path context
    pub fn file_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileIo {
            path: path.into(),
            source,
        }
    }

    /// Create a corruption error for a whole file
    pub fn corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            line: None,
            message: message.into(),
        }
    }

    /// Create a corruption error pointing at a 1-based line
    pub fn corrupt_line(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            line: Some(line),
            message: message.into(),
        }
    }

    pub fn not_found(store: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            store: store.into(),
            id: id.into(),
        }
    }

    pub fn validation(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            store: store.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(store: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            store: store.into(),
            reason: reason.into(),
        }
    }

    /// True for the not-found condition raised by `Store::set`
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|l| format!(" (line {})", l)).unwrap_or_default()
}
