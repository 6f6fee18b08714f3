//! Error types for feature computation.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for feature operations.
pub type Result<T> = std::result::Result<T, FeatureError>;

/// Errors raised by the feature stages.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// A date value could not be parsed as a calendar date
    #[error("Malformed date: {value:?}")]
    MalformedDate {
        /// Raw value as found in the input
        value: String,
    },

    /// A quantity value is not numeric
    #[error("Non-numeric quantity: {0}")]
    InvalidQuantity(String),

    /// The date column has a type that cannot hold calendar dates
    #[error("Unsupported date column type: {0}")]
    UnsupportedDateType(String),

    /// Lower bound of a date range lies after the upper bound
    #[error("Invalid date range: {min} is after {max}")]
    InvalidRange {
        /// Requested lower bound
        min: NaiveDate,
        /// Requested upper bound
        max: NaiveDate,
    },

    /// Window parameters are inconsistent
    #[error("Invalid window configuration: {0}")]
    InvalidWindow(String),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
