//! Join Resolver
//!
//! Resolves each sale against the product, brand and store master tables,
//! producing one denormalised transaction row per surviving
//! (sale, product, store) combination. Joins are inner equality joins: a sale
//! whose product or store does not resolve is dropped, and a brand name that
//! appears on several brand rows fans the product out to each of them.

use crate::error::{FeatureError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use salesfeat_data::RawTables;
use tracing::debug;

/// Accepted textual layouts for timestamp-style date values.
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Build the denormalised transaction table.
///
/// Output columns are every sales column plus `product_id`, `brand_id`,
/// `store_id` and the store attributes. `quantity` is cast to `Float64` and
/// `date` to a polars `Date`.
///
/// # Errors
///
/// Returns [`FeatureError::MalformedDate`] if any surviving row carries a date
/// that does not parse, [`FeatureError::InvalidQuantity`] for a non-numeric
/// quantity, and [`FeatureError::Polars`] for missing columns or incompatible
/// key types.
pub fn resolve_transactions(tables: &RawTables) -> Result<DataFrame> {
    // product -> brand on the brand's name
    let brands = tables
        .brands
        .clone()
        .lazy()
        .select([col("id").alias("brand_id"), col("name").alias("brand_name")]);

    let products = tables
        .products
        .clone()
        .lazy()
        .select([col("id").alias("product_id"), col("brand").alias("brand_name")])
        .join(
            brands,
            [col("brand_name")],
            [col("brand_name")],
            JoinArgs::new(JoinType::Inner),
        )
        .select([col("product_id"), col("brand_id")]);

    let stores = tables
        .stores
        .clone()
        .lazy()
        .rename(["id"], ["store_id"], true);

    let transactions = tables
        .sales
        .clone()
        .lazy()
        .with_columns([
            col("product").alias("product_id"),
            col("store").alias("store_id"),
        ])
        .join(
            products,
            [col("product_id")],
            [col("product_id")],
            JoinArgs::new(JoinType::Inner),
        )
        .join(
            stores,
            [col("store_id")],
            [col("store_id")],
            JoinArgs::new(JoinType::Inner),
        )
        .collect()?;

    debug!(
        sales = tables.sales.height(),
        resolved = transactions.height(),
        "resolved transactions"
    );

    let transactions = cast_quantity(transactions)?;
    parse_date_column(transactions)
}

/// Cast `quantity` to `Float64`, failing on any value that is not numeric.
fn cast_quantity(mut df: DataFrame) -> Result<DataFrame> {
    let quantity = df
        .column("quantity")?
        .strict_cast(&DataType::Float64)
        .map_err(|e| FeatureError::InvalidQuantity(e.to_string()))?;
    df.with_column(quantity)?;
    Ok(df)
}

/// Replace the `date` column with a polars `Date` column.
fn parse_date_column(mut df: DataFrame) -> Result<DataFrame> {
    let dtype = df.column("date")?.dtype().clone();

    let parsed: Column = match dtype {
        DataType::Date => return Ok(df),
        DataType::Datetime(_, _) => df.column("date")?.cast(&DataType::Date)?,
        DataType::String => {
            let raw = df.column("date")?.as_materialized_series().str()?;
            let mut dates = Vec::with_capacity(raw.len());
            for value in raw.into_iter() {
                let value = value.unwrap_or_default();
                let date = parse_date(value).ok_or_else(|| FeatureError::MalformedDate {
                    value: value.to_string(),
                })?;
                dates.push(date);
            }
            Column::new("date".into(), dates)
        }
        other => return Err(FeatureError::UnsupportedDateType(other.to_string())),
    };

    df.with_column(parsed)?;
    Ok(df)
}

/// Parse an ISO-8601 date, or a timestamp whose time part is discarded.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(brand_names: &[&str]) -> RawTables {
        let brand_ids: Vec<i64> = (1..=brand_names.len() as i64).collect();
        RawTables::from_frames(
            df!("id" => brand_ids, "name" => brand_names).unwrap(),
            df!("id" => [10i64, 11, 12], "name" => ["p10", "p11", "p12"], "brand" => ["A", "B", "Z"])
                .unwrap(),
            df!("id" => [100i64, 101], "city" => ["Lisbon", "Porto"]).unwrap(),
            df!(
                "product" => [10i64, 10, 11, 12, 99, 11],
                "store" => [100i64, 101, 100, 100, 100, 555],
                "date" => ["2021-01-01", "2021-01-02", "2021-01-01", "2021-01-01", "2021-01-01", "2021-01-03"],
                "quantity" => [1i64, 2, 3, 4, 5, 6]
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_unresolved_sales_are_dropped() {
        // product 12 has unknown brand Z, product 99 is unknown, store 555 is unknown
        let out = resolve_transactions(&tables(&["A", "B"])).unwrap();
        assert_eq!(out.height(), 3);
    }

    #[test]
    fn test_brand_name_collision_fans_out() {
        let unique = resolve_transactions(&tables(&["A", "B"])).unwrap();
        let colliding = resolve_transactions(&tables(&["A", "B", "A"])).unwrap();

        // the two sales of product 10 now match two brand rows each
        assert_eq!(colliding.height(), unique.height() + 2);
    }

    #[test]
    fn test_output_columns_and_types() {
        let out = resolve_transactions(&tables(&["A", "B"])).unwrap();

        for name in ["product_id", "brand_id", "store_id", "city", "date", "quantity"] {
            assert!(out.get_column_index(name).is_some(), "missing {name}");
        }
        assert_eq!(out.column("date").unwrap().dtype(), &DataType::Date);
        assert_eq!(out.column("quantity").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_malformed_date_fails_run() {
        let mut t = tables(&["A", "B"]);
        t.sales = df!(
            "product" => [10i64],
            "store" => [100i64],
            "date" => ["01/02/2021"],
            "quantity" => [1i64]
        )
        .unwrap();

        let err = resolve_transactions(&t).unwrap_err();
        assert!(matches!(err, FeatureError::MalformedDate { ref value } if value == "01/02/2021"));
    }

    #[test]
    fn test_store_attributes_follow_store_id() {
        let out = resolve_transactions(&tables(&["A", "B"])).unwrap();

        let stores = out.column("store_id").unwrap().i64().unwrap();
        let cities = out.column("city").unwrap().as_materialized_series();
        let cities = cities.str().unwrap();
        for (store, city) in stores.into_iter().zip(cities.into_iter()) {
            let expected = if store == Some(100) { "Lisbon" } else { "Porto" };
            assert_eq!(city, Some(expected));
        }
        assert!(out.get_column_index("id").is_none());
    }

    #[test]
    fn test_non_numeric_quantity_fails_run() {
        let mut t = tables(&["A", "B"]);
        t.sales = df!(
            "product" => [10i64, 10],
            "store" => [100i64, 100],
            "date" => ["2021-01-01", "2021-01-01"],
            "quantity" => ["5", "abc"]
        )
        .unwrap();

        let err = resolve_transactions(&t).unwrap_err();
        assert!(matches!(err, FeatureError::InvalidQuantity(_)));
    }

    #[test]
    fn test_numeric_text_quantity_is_parsed() {
        let mut t = tables(&["A", "B"]);
        t.sales = df!(
            "product" => [10i64],
            "store" => [100i64],
            "date" => ["2021-01-01"],
            "quantity" => ["2.5"]
        )
        .unwrap();

        let out = resolve_transactions(&t).unwrap();
        let quantity: Vec<Option<f64>> = out
            .column("quantity")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(quantity, vec![Some(2.5)]);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2021, 3, 4).unwrap();
        assert_eq!(parse_date("2021-03-04"), Some(expected));
        assert_eq!(parse_date(" 2021-03-04 "), Some(expected));
        assert_eq!(parse_date("2021-03-04T10:11:12"), Some(expected));
        assert_eq!(parse_date("2021-03-04 10:11:12.500"), Some(expected));
        assert_eq!(parse_date("2021-13-04"), None);
        assert_eq!(parse_date(""), None);
    }
}
