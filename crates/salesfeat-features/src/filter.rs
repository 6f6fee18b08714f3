//! Date Range Filter

use crate::error::{FeatureError, Result};
use crate::join::parse_date;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Inclusive calendar-date range with `min <= max`.
///
/// Deserialization goes through [`DateRange::new`], so an inverted range is
/// rejected there too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RangeBounds")]
pub struct DateRange {
    min: NaiveDate,
    max: NaiveDate,
}

/// Unchecked serialized form of [`DateRange`].
#[derive(Deserialize)]
struct RangeBounds {
    min: NaiveDate,
    max: NaiveDate,
}

impl TryFrom<RangeBounds> for DateRange {
    type Error = FeatureError;

    fn try_from(bounds: RangeBounds) -> Result<Self> {
        Self::new(bounds.min, bounds.max)
    }
}

impl DateRange {
    /// Create a range, rejecting an inverted one.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidRange`] if `min > max`.
    pub fn new(min: NaiveDate, max: NaiveDate) -> Result<Self> {
        if min > max {
            return Err(FeatureError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Parse both bounds from ISO-8601 strings.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::MalformedDate`] for an unparseable bound and
    /// [`FeatureError::InvalidRange`] for an inverted range.
    pub fn parse(min: &str, max: &str) -> Result<Self> {
        let parse = |value: &str| {
            parse_date(value).ok_or_else(|| FeatureError::MalformedDate {
                value: value.to_string(),
            })
        };
        Self::new(parse(min)?, parse(max)?)
    }

    /// Lower bound (inclusive).
    pub const fn min(&self) -> NaiveDate {
        self.min
    }

    /// Upper bound (inclusive).
    pub const fn max(&self) -> NaiveDate {
        self.max
    }

    /// Whether `date` lies inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.min <= date && date <= self.max
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self {
            min: NaiveDate::from_ymd_opt(2021, 1, 8).expect("valid calendar date"),
            max: NaiveDate::from_ymd_opt(2021, 5, 30).expect("valid calendar date"),
        }
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}

/// Keep rows whose `date` lies in `range`, bounds included.
///
/// # Errors
///
/// Returns a polars error if `rows` has no `date` column.
pub fn filter_date_range(rows: &DataFrame, range: &DateRange) -> Result<DataFrame> {
    let filtered = rows
        .clone()
        .lazy()
        .filter(
            col("date")
                .gt_eq(lit(range.min()))
                .and(col("date").lt_eq(lit(range.max()))),
        )
        .collect()?;
    Ok(filtered)
}
