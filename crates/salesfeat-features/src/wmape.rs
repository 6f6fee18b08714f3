//! WMAPE Ranker
//!
//! Scores the moving-average baseline against actual product sales per
//! (product, store, brand):
//!
//! ```text
//! WMAPE = sum(|actual - MA|) / sum(actual)
//! ```
//!
//! Rows with a null actual or baseline are ignored. A group whose actual
//! sales sum to zero is kept with a null WMAPE rather than dropped.

use crate::error::Result;
use crate::window::{Granularity, WindowConfig};
use polars::prelude::*;
use tracing::debug;

/// Name of the error column in the ranking output.
pub const WMAPE_COLUMN: &str = "WMAPE";

/// WMAPE of every (product_id, store_id, brand_id) group, worst first.
///
/// Nulls sort last; groups with equal WMAPE keep first-appearance order.
///
/// # Errors
///
/// Returns a polars error if `rows` lacks the key, sales or moving-average
/// columns.
pub fn wmape_by_group(rows: &DataFrame, config: &WindowConfig) -> Result<DataFrame> {
    let actual = Granularity::ProductStore.sales_column();
    let baseline = config.ma_column(Granularity::ProductStore);
    let baseline = baseline.as_str();

    let ranked = rows
        .clone()
        .lazy()
        .filter(
            col(actual)
                .is_not_null()
                .and(col(baseline).is_not_null())
                .and(col("brand_id").is_not_null()),
        )
        .group_by_stable([col("product_id"), col("store_id"), col("brand_id")])
        .agg([
            (col(actual) - col(baseline)).abs().sum().alias("abs_error"),
            col(actual).sum().alias("actual_total"),
        ])
        .with_column(
            when(col("actual_total").neq(lit(0.0)))
                .then(col("abs_error") / col("actual_total"))
                .otherwise(lit(NULL).cast(DataType::Float64))
                .alias(WMAPE_COLUMN),
        )
        .select([
            col("product_id"),
            col("store_id"),
            col("brand_id"),
            col(WMAPE_COLUMN),
        ])
        .sort(
            [WMAPE_COLUMN],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_nulls_last(true)
                .with_maintain_order(true),
        )
        .collect()?;

    debug!(groups = ranked.height(), "ranked WMAPE groups");
    Ok(ranked)
}

/// The `k` groups with the highest WMAPE.
///
/// `k = 0` yields an empty table; `k` above the group count yields all groups.
///
/// # Errors
///
/// See [`wmape_by_group`].
pub fn top_wmape(rows: &DataFrame, k: usize, config: &WindowConfig) -> Result<DataFrame> {
    Ok(wmape_by_group(rows, config)?.head(Some(k)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    /// Three groups: (1,1,1) WMAPE 0.5, (2,1,1) zero sales, (3,1,1) WMAPE 0.1.
    fn rows() -> DataFrame {
        df!(
            "product_id" => [1i64, 1, 2, 2, 3, 3, 3],
            "store_id" => [1i64; 7],
            "brand_id" => [1i64; 7],
            "sales_product" => [Some(10.0), Some(10.0), Some(0.0), Some(0.0), Some(50.0), Some(50.0), None],
            "MA7_P" => [Some(5.0), Some(15.0), Some(1.0), Some(0.0), Some(45.0), Some(55.0), Some(3.0)]
        )
        .unwrap()
    }

    fn wmapes(df: &DataFrame) -> Vec<Option<f64>> {
        df.column(WMAPE_COLUMN).unwrap().f64().unwrap().into_iter().collect()
    }

    fn products(df: &DataFrame) -> Vec<Option<i64>> {
        df.column("product_id").unwrap().i64().unwrap().into_iter().collect()
    }

    #[test]
    fn test_ranking_and_zero_guard() {
        let ranked = wmape_by_group(&rows(), &WindowConfig::default()).unwrap();

        assert_eq!(products(&ranked), vec![Some(1), Some(3), Some(2)]);
        let w = wmapes(&ranked);
        assert_relative_eq!(w[0].unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(w[1].unwrap(), 0.1, epsilon = 1e-12);
        assert_eq!(w[2], None);
    }

    #[test]
    fn test_output_columns() {
        let ranked = wmape_by_group(&rows(), &WindowConfig::default()).unwrap();
        let names: Vec<String> = ranked
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(names, vec!["product_id", "store_id", "brand_id", "WMAPE"]);
    }

    #[test]
    fn test_null_baseline_rows_are_dropped() {
        let df = df!(
            "product_id" => [1i64, 1],
            "store_id" => [1i64, 1],
            "brand_id" => [1i64, 1],
            "sales_product" => [Some(10.0), Some(1000.0)],
            "MA7_P" => [Some(8.0), None]
        )
        .unwrap();

        let ranked = wmape_by_group(&df, &WindowConfig::default()).unwrap();
        assert_relative_eq!(wmapes(&ranked)[0].unwrap(), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_group_without_usable_rows_is_absent() {
        let df = df!(
            "product_id" => [1i64, 2],
            "store_id" => [1i64, 1],
            "brand_id" => [1i64, 1],
            "sales_product" => [Some(10.0), None],
            "MA7_P" => [Some(10.0), Some(4.0)]
        )
        .unwrap();

        let ranked = wmape_by_group(&df, &WindowConfig::default()).unwrap();
        assert_eq!(products(&ranked), vec![Some(1)]);
        assert_eq!(wmapes(&ranked), vec![Some(0.0)]);
    }

    #[rstest]
    #[case::none(0, 0)]
    #[case::some(2, 2)]
    #[case::exact(3, 3)]
    #[case::more_than_groups(10, 3)]
    fn test_top_k(#[case] k: usize, #[case] expected: usize) {
        let top = top_wmape(&rows(), k, &WindowConfig::default()).unwrap();
        assert_eq!(top.height(), expected);
        assert_eq!(top.width(), 4);
    }

    #[test]
    fn test_top_k_keeps_order() {
        let top = top_wmape(&rows(), 2, &WindowConfig::default()).unwrap();
        assert_eq!(products(&top), vec![Some(1), Some(3)]);
    }
}
