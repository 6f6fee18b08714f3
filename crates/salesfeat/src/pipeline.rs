//! End-to-end feature pipeline.
//!
//! Each stage is a pure function from immutable frames to a new frame:
//!
//! ```text
//! raw tables -> resolve -> window x3 -> merge -> { date filter, WMAPE top-K }
//! ```

use polars::prelude::*;
use salesfeat_data::{DataError, KeyPolicy, RawTables, validate_schema, validate_unique_keys};
use salesfeat_features::{
    DateRange, FeatureError, WindowConfig, compute_all, filter_date_range, merge_features,
    resolve_transactions, wmape_by_group,
};
use salesfeat_output::{
    ExportError, ExportFormat, Exporter, RunSummary, StageCounts, wmape_records, write_frame_csv,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// File name of the exported feature table.
pub const FEATURES_FILE: &str = "features.csv";

/// File name of the exported WMAPE ranking.
pub const MAPES_FILE: &str = "mapes.csv";

/// Errors from any pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input loading or validation failed.
    #[error(transparent)]
    Data(#[from] DataError),

    /// A feature stage failed.
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// Writing results failed.
    #[error(transparent)]
    Export(#[from] ExportError),

}

/// Configuration for a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Dates of the exported feature rows (default: 2021-01-08 to 2021-05-30)
    pub date_range: DateRange,
    /// Number of WMAPE groups to keep (default: 5)
    pub top: usize,
    /// Moving-average and lag parameters (default: 7 / 1 / 7)
    pub window: WindowConfig,
    /// Treatment of repeated master-table keys (default: permissive)
    pub key_policy: KeyPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            date_range: DateRange::default(),
            top: 5,
            window: WindowConfig::default(),
            key_policy: KeyPolicy::default(),
        }
    }
}

/// Results of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Denormalised transactions.
    pub transactions: DataFrame,
    /// Merged feature table over all dates.
    pub features: DataFrame,
    /// Feature rows inside the configured date range.
    pub filtered: DataFrame,
    /// Top-K WMAPE groups, worst first.
    pub wmape: DataFrame,
    /// Row counts per stage.
    pub counts: StageCounts,
}

impl PipelineOutput {
    /// Summarise the run for reporting.
    ///
    /// # Errors
    ///
    /// Returns an error if the WMAPE frame cannot be converted to records.
    pub fn summary(&self, config: &PipelineConfig) -> Result<RunSummary, ExportError> {
        Ok(RunSummary::new(
            config.date_range.min(),
            config.date_range.max(),
            config.top,
            self.counts,
            wmape_records(&self.wmape)?,
        ))
    }
}

/// Run every stage over in-memory tables.
///
/// # Errors
///
/// Fails on schema or key violations, an invalid window, a malformed date, or
/// any polars error; no partial output is produced.
pub fn run(tables: &RawTables, config: &PipelineConfig) -> Result<PipelineOutput, PipelineError> {
    validate_schema(tables)?;
    validate_unique_keys(tables, config.key_policy)?;
    config.window.validate()?;

    let transactions = resolve_transactions(tables)?;
    info!(
        sales = tables.sales.height(),
        transactions = transactions.height(),
        "joined sales with products, brands and stores"
    );

    let levels = compute_all(&transactions, &config.window)?;
    let features = merge_features(&levels, &transactions, &config.window)?;
    info!(rows = features.height(), "computed feature table");

    let filtered = filter_date_range(&features, &config.date_range)?;
    let ranking = wmape_by_group(&features, &config.window)?;
    let wmape = ranking.head(Some(config.top));
    info!(
        range = %config.date_range,
        rows = filtered.height(),
        groups = ranking.height(),
        "filtered features and ranked WMAPE"
    );

    let counts = StageCounts {
        sales: tables.sales.height(),
        transactions: transactions.height(),
        feature_rows: features.height(),
        filtered_rows: filtered.height(),
        wmape_groups: ranking.height(),
    };

    Ok(PipelineOutput {
        transactions,
        features,
        filtered,
        wmape,
        counts,
    })
}

/// Locations of the written result files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Path of `features.csv`
    pub features: PathBuf,
    /// Path of `mapes.csv`
    pub mapes: PathBuf,
}

/// Write `features.csv` and `mapes.csv` into `dir`.
///
/// # Errors
///
/// Returns an error if either file cannot be written.
pub fn write_outputs(output: &PipelineOutput, dir: &Path) -> Result<OutputPaths, PipelineError> {
    let paths = OutputPaths {
        features: dir.join(FEATURES_FILE),
        mapes: dir.join(MAPES_FILE),
    };

    let mut filtered = output.filtered.clone();
    write_frame_csv(&mut filtered, &paths.features)?;
    wmape_records(&output.wmape)?.export_to_file(&paths.mapes, ExportFormat::Csv)?;

    info!(
        features = %paths.features.display(),
        mapes = %paths.mapes.display(),
        "wrote results"
    );
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> RawTables {
        RawTables::from_frames(
            df!("id" => [1i64, 2], "name" => ["Acme", "Globex"]).unwrap(),
            df!("id" => [10i64, 11], "brand" => ["Acme", "Globex"]).unwrap(),
            df!("id" => [100i64], "region" => ["north"]).unwrap(),
            df!(
                "product" => [10i64, 11, 10],
                "store" => [100i64, 100, 100],
                "date" => ["2021-01-08", "2021-01-08", "2021-01-09"],
                "quantity" => [3i64, 4, 5]
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.top, 5);
        assert_eq!(config.window, WindowConfig::default());
        assert_eq!(config.key_policy, KeyPolicy::Permissive);
        assert_eq!(config.date_range.to_string(), "2021-01-08..=2021-05-30");
    }

    #[test]
    fn test_run_counts() {
        let output = run(&tables(), &PipelineConfig::default()).unwrap();

        assert_eq!(output.counts.sales, 3);
        assert_eq!(output.counts.transactions, 3);
        assert_eq!(output.counts.feature_rows, 3);
        assert_eq!(output.counts.filtered_rows, 3);
        assert_eq!(output.counts.wmape_groups, 2);
        assert_eq!(output.wmape.height(), 2);
    }

    #[test]
    fn test_strict_keys_reject_fan_out() {
        let mut t = tables();
        t.brands = df!("id" => [1i64, 2, 3], "name" => ["Acme", "Globex", "Acme"]).unwrap();

        let config = PipelineConfig {
            key_policy: KeyPolicy::Strict,
            ..Default::default()
        };
        let err = run(&t, &config).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Data(DataError::DuplicateKey { .. })
        ));

        // permissive run multiplies Acme's sales instead
        let output = run(&t, &PipelineConfig::default()).unwrap();
        assert_eq!(output.counts.transactions, 5);
    }

    #[test]
    fn test_schema_checked_before_join() {
        let mut t = tables();
        t.sales = t.sales.drop("date").unwrap();

        let err = run(&t, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Data(DataError::Schema { .. })));
    }

    #[test]
    fn test_config_json_rejects_inverted_range() {
        let json = r#"{
            "date_range": {"min": "2021-05-30", "max": "2021-01-08"},
            "top": 5,
            "window": {"window": 7, "min_periods": 1, "lag": 7},
            "key_policy": "permissive"
        }"#;
        assert!(serde_json::from_str::<PipelineConfig>(json).is_err());

        let valid = json.replace("2021-05-30", "2021-01-01");
        let config: PipelineConfig = serde_json::from_str(&valid).unwrap();
        assert_eq!(config.date_range.to_string(), "2021-01-01..=2021-01-08");
    }

    #[test]
    fn test_summary_from_output() {
        let config = PipelineConfig {
            top: 1,
            ..Default::default()
        };
        let output = run(&tables(), &config).unwrap();
        let summary = output.summary(&config).unwrap();

        assert_eq!(summary.top, 1);
        assert_eq!(summary.worst.len(), 1);
        assert_eq!(summary.counts, output.counts);
    }
}
