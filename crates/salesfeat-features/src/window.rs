//! Window Feature Engine
//!
//! Aggregates transaction quantity per (grouping keys, date) and computes, per
//! grouping-key partition ordered by date:
//!
//! - a trailing moving average over the last `window` observed dates
//!   (positional, not calendar; at least `min_periods` observations)
//! - the aggregate value `lag` observed dates earlier (null when absent)
//!
//! Gaps in the calendar are not filled, so a window can span more than
//! `window` calendar days.

use crate::error::{FeatureError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Grouping level at which sales are aggregated before windowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One series per (product, store)
    ProductStore,
    /// One series per (brand, store)
    BrandStore,
    /// One series per store
    Store,
}

impl Granularity {
    /// All granularities, finest first.
    pub const fn all() -> [Self; 3] {
        [Self::ProductStore, Self::BrandStore, Self::Store]
    }

    /// Short identifier.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ProductStore => "product_store",
            Self::BrandStore => "brand_store",
            Self::Store => "store",
        }
    }

    /// Partition keys, excluding the date.
    pub const fn keys(&self) -> &'static [&'static str] {
        match self {
            Self::ProductStore => &["product_id", "store_id"],
            Self::BrandStore => &["brand_id", "store_id"],
            Self::Store => &["store_id"],
        }
    }

    /// Suffix used in feature column names.
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::ProductStore => "P",
            Self::BrandStore => "B",
            Self::Store => "S",
        }
    }

    /// Name of the aggregated sales column.
    pub const fn sales_column(&self) -> &'static str {
        match self {
            Self::ProductStore => "sales_product",
            Self::BrandStore => "sales_brand",
            Self::Store => "sales_store",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration for the rolling features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Moving-average window in observed dates (default: 7)
    pub window: usize,
    /// Minimum observations for a defined average (default: 1)
    pub min_periods: usize,
    /// Lag offset in observed dates (default: 7)
    pub lag: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window: 7,
            min_periods: 1,
            lag: 7,
        }
    }
}

impl WindowConfig {
    /// Check the parameters describe a computable window.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidWindow`] when `window` or `lag` is zero or
    /// `min_periods` is outside `1..=window`.
    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(FeatureError::InvalidWindow("window must be positive".into()));
        }
        if self.min_periods == 0 || self.min_periods > self.window {
            return Err(FeatureError::InvalidWindow(format!(
                "min_periods {} must lie in 1..={}",
                self.min_periods, self.window
            )));
        }
        if self.lag == 0 {
            return Err(FeatureError::InvalidWindow("lag must be positive".into()));
        }
        Ok(())
    }

    /// Moving-average column name, e.g. `MA7_P`.
    pub fn ma_column(&self, granularity: Granularity) -> String {
        format!("MA{}_{}", self.window, granularity.suffix())
    }

    /// Lag column name, e.g. `LAG7_P`.
    pub fn lag_column(&self, granularity: Granularity) -> String {
        format!("LAG{}_{}", self.lag, granularity.suffix())
    }
}

/// Computes the rolling features of one granularity.
#[derive(Debug, Clone)]
pub struct WindowFeatureEngine {
    granularity: Granularity,
    config: WindowConfig,
}

impl WindowFeatureEngine {
    /// Engine with the default 7-period window and lag.
    pub fn new(granularity: Granularity) -> Self {
        Self::with_config(granularity, WindowConfig::default())
    }

    /// Engine with explicit window parameters.
    pub const fn with_config(granularity: Granularity, config: WindowConfig) -> Self {
        Self {
            granularity,
            config,
        }
    }

    /// Granularity this engine aggregates at.
    pub const fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Window parameters.
    pub const fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Compute per-date aggregates with moving average and lag.
    ///
    /// # Arguments
    /// * `transactions` - denormalised transactions with the grouping keys,
    ///   `date` and `quantity`
    ///
    /// # Returns
    /// One row per (keys, date) with columns: keys..., date, sales column,
    /// moving-average column, lag column; sorted by keys then date.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidWindow`] for bad parameters and
    /// [`FeatureError::Polars`] if a required column is missing.
    pub fn compute_features(&self, transactions: &DataFrame) -> Result<DataFrame> {
        self.config.validate()?;

        let keys = self.granularity.keys();
        let partition: Vec<Expr> = keys.iter().map(|k| col(*k)).collect();
        let group_by: Vec<Expr> = partition
            .iter()
            .cloned()
            .chain(std::iter::once(col("date")))
            .collect();
        let sort_by: Vec<&str> = keys.iter().copied().chain(["date"]).collect();

        let sales = self.granularity.sales_column();
        let ma = self.config.ma_column(self.granularity);
        let lag = self.config.lag_column(self.granularity);

        let result = transactions
            .clone()
            .lazy()
            .group_by(group_by)
            .agg([col("quantity").sum().alias(sales)])
            .sort(sort_by, SortMultipleOptions::default())
            .with_columns([
                col(sales)
                    .rolling_mean(RollingOptionsFixedWindow {
                        window_size: self.config.window,
                        min_periods: self.config.min_periods,
                        ..Default::default()
                    })
                    .over(partition.clone())
                    .alias(ma.as_str()),
                col(sales)
                    .shift(lit(self.config.lag as i64))
                    .over(partition)
                    .alias(lag.as_str()),
            ])
            .collect()?;

        debug!(
            granularity = %self.granularity,
            rows = result.height(),
            "computed window features"
        );

        Ok(result)
    }
}

/// Feature tables for all three granularities.
#[derive(Debug, Clone)]
pub struct GranularityFeatures {
    /// Product x store features
    pub product: DataFrame,
    /// Brand x store features
    pub brand: DataFrame,
    /// Store features
    pub store: DataFrame,
}

/// Run the engine at every granularity over the same transactions.
///
/// # Errors
///
/// Propagates the first failing granularity's error.
pub fn compute_all(transactions: &DataFrame, config: &WindowConfig) -> Result<GranularityFeatures> {
    let run = |granularity| {
        WindowFeatureEngine::with_config(granularity, config.clone()).compute_features(transactions)
    };

    Ok(GranularityFeatures {
        product: run(Granularity::ProductStore)?,
        brand: run(Granularity::BrandStore)?,
        store: run(Granularity::Store)?,
    })
}
