//! CSV loading for the four raw input tables.

use crate::error::{DataError, Result};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Number of rows polars scans to infer column types.
const INFER_SCHEMA_ROWS: usize = 10_000;

/// The raw input tables of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// Brand master data
    Brand,
    /// Product master data
    Product,
    /// Store master data
    Store,
    /// Sales transactions
    Sales,
}

impl TableKind {
    /// All tables in load order.
    pub const fn all() -> [Self; 4] {
        [Self::Brand, Self::Product, Self::Store, Self::Sales]
    }

    /// Logical table name used in error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Brand => "brand",
            Self::Product => "product",
            Self::Store => "store",
            Self::Sales => "sales",
        }
    }

    /// File name of the table inside a data directory.
    pub const fn file_name(&self) -> &'static str {
        match self {
            Self::Brand => "brand.csv",
            Self::Product => "product.csv",
            Self::Store => "store.csv",
            Self::Sales => "sales.csv",
        }
    }

    /// Columns the pipeline reads from this table.
    pub const fn required_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Brand => &["id", "name"],
            Self::Product => &["id", "brand"],
            Self::Store => &["id"],
            Self::Sales => &["product", "store", "date", "quantity"],
        }
    }
}

/// Locations of the four input CSV files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPaths {
    /// Path to `brand.csv`
    pub brand: PathBuf,
    /// Path to `product.csv`
    pub product: PathBuf,
    /// Path to `store.csv`
    pub store: PathBuf,
    /// Path to `sales.csv`
    pub sales: PathBuf,
}

impl InputPaths {
    /// Resolve the standard file names inside `dir`.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            brand: dir.join(TableKind::Brand.file_name()),
            product: dir.join(TableKind::Product.file_name()),
            store: dir.join(TableKind::Store.file_name()),
            sales: dir.join(TableKind::Sales.file_name()),
        }
    }

    /// Path of a given table.
    pub fn path(&self, kind: TableKind) -> &Path {
        match kind {
            TableKind::Brand => &self.brand,
            TableKind::Product => &self.product,
            TableKind::Store => &self.store,
            TableKind::Sales => &self.sales,
        }
    }
}

/// In-memory snapshot of the four input tables.
#[derive(Debug, Clone)]
pub struct RawTables {
    /// Brand table (`id`, `name`, ...)
    pub brands: DataFrame,
    /// Product table (`id`, `brand`, ...)
    pub products: DataFrame,
    /// Store table (`id`, attributes...)
    pub stores: DataFrame,
    /// Sales table (`product`, `store`, `date`, `quantity`, ...)
    pub sales: DataFrame,
}

impl RawTables {
    /// Bundle frames that are already in memory.
    pub const fn from_frames(
        brands: DataFrame,
        products: DataFrame,
        stores: DataFrame,
        sales: DataFrame,
    ) -> Self {
        Self {
            brands,
            products,
            stores,
            sales,
        }
    }

    /// Frame of a given table.
    pub const fn table(&self, kind: TableKind) -> &DataFrame {
        match kind {
            TableKind::Brand => &self.brands,
            TableKind::Product => &self.products,
            TableKind::Store => &self.stores,
            TableKind::Sales => &self.sales,
        }
    }
}

/// Load all four tables from CSV.
///
/// Every path is checked before any file is parsed, so a missing table is
/// reported without doing partial work.
///
/// # Errors
///
/// Returns [`DataError::MissingInput`] for an absent file and
/// [`DataError::Polars`] when a file cannot be parsed as CSV.
pub fn load_tables(paths: &InputPaths) -> Result<RawTables> {
    for kind in TableKind::all() {
        let path = paths.path(kind);
        if !path.is_file() {
            return Err(DataError::MissingInput {
                table: kind.name(),
                path: path.to_path_buf(),
            });
        }
    }

    Ok(RawTables {
        brands: read_table(TableKind::Brand, &paths.brand)?,
        products: read_table(TableKind::Product, &paths.product)?,
        stores: read_table(TableKind::Store, &paths.store)?,
        sales: read_table(TableKind::Sales, &paths.sales)?,
    })
}

/// Read a single headed CSV file into a DataFrame.
fn read_table(kind: TableKind, path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    debug!(
        table = kind.name(),
        rows = df.height(),
        columns = df.width(),
        "loaded table"
    );

    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_paths_from_dir() {
        let paths = InputPaths::from_dir("/data");
        assert_eq!(paths.brand, PathBuf::from("/data/brand.csv"));
        assert_eq!(paths.product, PathBuf::from("/data/product.csv"));
        assert_eq!(paths.store, PathBuf::from("/data/store.csv"));
        assert_eq!(paths.sales, PathBuf::from("/data/sales.csv"));
    }

    #[test]
    fn test_missing_input_is_reported_with_table() {
        let dir = std::env::temp_dir().join("salesfeat_loader_missing");
        let paths = InputPaths::from_dir(&dir);

        let err = load_tables(&paths).unwrap_err();
        match err {
            DataError::MissingInput { table, path } => {
                assert_eq!(table, "brand");
                assert_eq!(path, dir.join("brand.csv"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_table_kind_metadata() {
        assert_eq!(TableKind::Sales.file_name(), "sales.csv");
        assert!(TableKind::Sales.required_columns().contains(&"quantity"));
        assert_eq!(TableKind::all().len(), 4);
    }
}
