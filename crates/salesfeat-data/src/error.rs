//! Error types for data operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while loading and validating input tables.
#[derive(Debug, Error)]
pub enum DataError {
    /// A required input file does not exist
    #[error("Missing input for table '{table}': {}", path.display())]
    MissingInput {
        /// Logical table name
        table: &'static str,
        /// Path that was probed
        path: PathBuf,
    },

    /// An expected column is absent
    #[error("Schema error: table '{table}' has no column '{column}'")]
    Schema {
        /// Logical table name
        table: &'static str,
        /// Column that was expected
        column: String,
    },

    /// A join key that must be unique appears more than once
    #[error("Duplicate key in table '{table}': column '{column}' repeats value {value}")]
    DuplicateKey {
        /// Logical table name
        table: &'static str,
        /// Key column
        column: String,
        /// Offending value, rendered for display
        value: String,
    },

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
