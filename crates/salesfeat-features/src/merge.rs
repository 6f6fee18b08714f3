//! Feature Merger
//!
//! Starts from the product x store features and left-joins the brand and
//! store level features next to them. The left side is never dropped, so the
//! merged table has exactly as many rows as the product level table unless
//! the brand lookup itself maps one (product, store, date) to several brands.

use crate::error::Result;
use crate::window::{Granularity, GranularityFeatures, WindowConfig};
use polars::prelude::*;
use tracing::debug;

/// Ordered output columns of the merged feature table.
pub fn feature_columns(config: &WindowConfig) -> Vec<String> {
    let mut columns: Vec<String> = ["product_id", "store_id", "brand_id", "date"]
        .into_iter()
        .map(String::from)
        .collect();
    for granularity in Granularity::all() {
        columns.push(granularity.sales_column().to_string());
        columns.push(config.ma_column(granularity));
        columns.push(config.lag_column(granularity));
    }
    columns
}

/// Merge the three granularity tables into one row per (product, store, date).
///
/// `transactions` supplies the (product, store, date) -> brand lookup.
///
/// # Returns
/// DataFrame with the columns of [`feature_columns`], sorted by
/// (product_id, brand_id, store_id, date) ascending with nulls last; rows with
/// equal keys keep their relative order.
///
/// # Errors
///
/// Returns a polars error if an input lacks a join column.
pub fn merge_features(
    features: &GranularityFeatures,
    transactions: &DataFrame,
    config: &WindowConfig,
) -> Result<DataFrame> {
    let brand_lookup = transactions
        .clone()
        .lazy()
        .select([
            col("product_id"),
            col("store_id"),
            col("brand_id"),
            col("date"),
        ])
        .unique_stable(None, UniqueKeepStrategy::First);

    let product_keys = [col("product_id"), col("store_id"), col("date")];
    let brand_keys = [col("brand_id"), col("store_id"), col("date")];
    let store_keys = [col("store_id"), col("date")];

    let output: Vec<Expr> = feature_columns(config)
        .iter()
        .map(|name| col(name.as_str()))
        .collect();

    let merged = features
        .product
        .clone()
        .lazy()
        .join(
            brand_lookup,
            product_keys.clone(),
            product_keys,
            JoinArgs::new(JoinType::Left),
        )
        .join(
            features.brand.clone().lazy(),
            brand_keys.clone(),
            brand_keys,
            JoinArgs::new(JoinType::Left),
        )
        .join(
            features.store.clone().lazy(),
            store_keys.clone(),
            store_keys,
            JoinArgs::new(JoinType::Left),
        )
        .sort(
            ["product_id", "brand_id", "store_id", "date"],
            SortMultipleOptions::default()
                .with_nulls_last(true)
                .with_maintain_order(true),
        )
        .select(output)
        .collect()?;

    debug!(
        product_rows = features.product.height(),
        merged_rows = merged.height(),
        "merged feature tables"
    );

    Ok(merged)
}
