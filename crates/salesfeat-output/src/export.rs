//! Export functionality for salesfeat result tables.
//!
//! Wide feature tables are written straight from polars. WMAPE rankings are
//! converted to typed [`WmapeRecord`]s first so they can be exported as CSV or
//! JSON through the [`Exporter`] trait.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Polars error.
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Output bytes were not valid UTF-8.
    #[error("Invalid UTF-8 in output: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

/// Column headers of `mapes.csv`.
const WMAPE_HEADER: [&str; 4] = ["product_id", "store_id", "brand_id", "WMAPE"];

/// WMAPE of one (product, store, brand) group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WmapeRecord {
    /// Product identifier.
    pub product_id: String,

    /// Store identifier.
    pub store_id: String,

    /// Brand identifier.
    pub brand_id: String,

    /// Weighted MAPE; `None` when the group's sales sum to zero.
    #[serde(rename = "WMAPE")]
    pub wmape: Option<f64>,
}

impl WmapeRecord {
    /// Create a new WMAPE record.
    pub const fn new(
        product_id: String,
        store_id: String,
        brand_id: String,
        wmape: Option<f64>,
    ) -> Self {
        Self {
            product_id,
            store_id,
            brand_id,
            wmape,
        }
    }
}

/// Convert a WMAPE ranking frame into typed records, preserving row order.
///
/// Identifier columns of any dtype are rendered as strings.
///
/// # Errors
///
/// Returns a polars error if a column is missing or `WMAPE` is not `Float64`.
pub fn wmape_records(df: &DataFrame) -> Result<Vec<WmapeRecord>, ExportError> {
    let as_text = |name: &str| -> Result<Column, ExportError> {
        Ok(df.column(name)?.cast(&DataType::String)?)
    };
    let products = as_text("product_id")?;
    let stores = as_text("store_id")?;
    let brands = as_text("brand_id")?;
    let products = products.as_materialized_series().str()?;
    let stores = stores.as_materialized_series().str()?;
    let brands = brands.as_materialized_series().str()?;
    let errors = df.column("WMAPE")?.f64()?;

    let records = (0..df.height())
        .map(|i| {
            WmapeRecord::new(
                products.get(i).unwrap_or_default().to_string(),
                stores.get(i).unwrap_or_default().to_string(),
                brands.get(i).unwrap_or_default().to_string(),
                errors.get(i),
            )
        })
        .collect();

    Ok(records)
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

impl Exporter for Vec<WmapeRecord> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                // header is written by hand so an empty ranking still has one
                let mut wtr = csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(vec![]);
                wtr.write_record(WMAPE_HEADER)?;
                for record in self {
                    wtr.serialize(record)?;
                }
                let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
                Ok(String::from_utf8(bytes)?)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

/// Write a frame as headed CSV; nulls become empty fields, dates ISO-8601.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_frame_csv(df: &mut DataFrame, path: &Path) -> Result<(), ExportError> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

/// Render a frame as headed CSV text.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn frame_to_csv_string(df: &mut DataFrame) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf).include_header(true).finish(df)?;
    Ok(String::from_utf8(buf)?)
}
