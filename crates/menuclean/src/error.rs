//! Error types for the menuclean library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for menuclean operations.
#[derive(Debug, Error)]
pub enum MenucleanError {
    /// Error reading or writing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reported by the relational store.
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Empty file or no columns to work with.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// A data row with more fields than the header.
    #[error("{table}: line {line} has {found} fields, header has {expected}")]
    RaggedRow {
        table: String,
        line: u64,
        expected: usize,
        found: usize,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A table name that does not map to a known entity.
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// A table the store was asked about has not been created.
    #[error("Table '{0}' does not exist")]
    MissingTable(String),

    /// A column required by an operation is absent.
    #[error("Column '{column}' not found in table '{table}'")]
    MissingColumn { table: String, column: String },

    /// An exclusion-set file could not be interpreted.
    #[error("Invalid exclusion set '{path}': {message}")]
    ExclusionSet { path: PathBuf, message: String },

    /// The run was interrupted before the unit of work completed.
    #[error("Interrupted: {0}")]
    Interrupted(String),
}

impl MenucleanError {
    /// Wrap an IO error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MenucleanError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for menuclean operations.
pub type Result<T> = std::result::Result<T, MenucleanError>;
