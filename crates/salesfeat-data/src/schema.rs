//! Column and key validation for raw tables.
//!
//! The join stages downstream use equality joins, so a repeated key on the
//! "one" side multiplies rows. [`KeyPolicy::Strict`] turns that into a load
//! time failure; [`KeyPolicy::Permissive`] keeps the multiplicative join.

use crate::error::{DataError, Result};
use crate::loader::{RawTables, TableKind};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How repeated join keys in master tables are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    /// Accept repeated keys; joins fan out
    #[default]
    Permissive,
    /// Reject repeated keys with [`DataError::DuplicateKey`]
    Strict,
}

/// Key columns that must be unique for a one-to-many join.
const UNIQUE_KEYS: [(TableKind, &str); 3] = [
    (TableKind::Brand, "name"),
    (TableKind::Product, "id"),
    (TableKind::Store, "id"),
];

/// Check that every table carries the columns the pipeline reads.
///
/// # Errors
///
/// Returns [`DataError::Schema`] naming the first absent column.
pub fn validate_schema(tables: &RawTables) -> Result<()> {
    for kind in TableKind::all() {
        let df = tables.table(kind);
        for column in kind.required_columns() {
            if df.get_column_index(column).is_none() {
                return Err(DataError::Schema {
                    table: kind.name(),
                    column: (*column).to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Check join-key uniqueness under the given policy.
///
/// # Errors
///
/// Under [`KeyPolicy::Strict`], returns [`DataError::DuplicateKey`] for the
/// first repeated value found (in first-appearance order).
pub fn validate_unique_keys(tables: &RawTables, policy: KeyPolicy) -> Result<()> {
    if policy == KeyPolicy::Permissive {
        return Ok(());
    }

    for (kind, column) in UNIQUE_KEYS {
        if let Some(value) = first_duplicate(tables.table(kind), column)? {
            return Err(DataError::DuplicateKey {
                table: kind.name(),
                column: column.to_string(),
                value,
            });
        }
        debug!(table = kind.name(), column, "key is unique");
    }
    Ok(())
}

/// First value of `column` that occurs more than once, if any.
fn first_duplicate(df: &DataFrame, column: &str) -> Result<Option<String>> {
    let dups = df
        .clone()
        .lazy()
        .group_by_stable([col(column)])
        .agg([len().alias("occurrences")])
        .filter(col("occurrences").gt(lit(1)))
        .limit(1)
        .collect()?;

    if dups.height() == 0 {
        return Ok(None);
    }
    let value = dups.column(column)?.get(0)?;
    Ok(Some(
        value
            .get_str()
            .map_or_else(|| value.to_string(), str::to_string),
    ))
}
