//! Run summary of a pipeline execution.
//!
//! Collects per-stage row counts and the top WMAPE groups so a run can be
//! reported on the terminal or as JSON.

use crate::export::WmapeRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Row counts observed at each pipeline stage.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageCounts {
    /// Raw sales rows loaded.
    pub sales: usize,

    /// Denormalised transactions after joins.
    pub transactions: usize,

    /// Merged feature rows (one per product, store, date).
    pub feature_rows: usize,

    /// Feature rows inside the requested date range.
    pub filtered_rows: usize,

    /// (product, store, brand) groups with a WMAPE entry.
    pub wmape_groups: usize,
}

impl StageCounts {
    /// Sales rows that did not resolve to a product and store.
    ///
    /// Saturates at zero when brand fan-out produced more transactions than
    /// sales.
    pub const fn dropped_sales(&self) -> usize {
        self.sales.saturating_sub(self.transactions)
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// First date of the exported feature range.
    pub min_date: NaiveDate,

    /// Last date of the exported feature range.
    pub max_date: NaiveDate,

    /// Requested number of WMAPE groups.
    pub top: usize,

    /// Stage row counts.
    pub counts: StageCounts,

    /// Highest-WMAPE groups, worst first.
    pub worst: Vec<WmapeRecord>,
}

impl RunSummary {
    /// Create a new run summary.
    pub const fn new(
        min_date: NaiveDate,
        max_date: NaiveDate,
        top: usize,
        counts: StageCounts,
        worst: Vec<WmapeRecord>,
    ) -> Self {
        Self {
            min_date,
            max_date,
            top,
            counts,
            worst,
        }
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str("\nSales Feature Run\n");
        output.push_str(&format!(
            "Range: {} to {}\n",
            self.min_date, self.max_date
        ));
        output.push_str(&"=".repeat(64));
        output.push('\n');

        output.push_str("\nStage Row Counts:\n");
        output.push_str(&"-".repeat(64));
        output.push('\n');
        let c = &self.counts;
        output.push_str(&format!("  Sales loaded:             {:>10}\n", c.sales));
        output.push_str(&format!(
            "  Transactions resolved:    {:>10} ({} dropped)\n",
            c.transactions,
            c.dropped_sales()
        ));
        output.push_str(&format!("  Feature rows:             {:>10}\n", c.feature_rows));
        output.push_str(&format!("  Rows in range:            {:>10}\n", c.filtered_rows));
        output.push_str(&format!("  WMAPE groups:             {:>10}\n", c.wmape_groups));

        output.push_str(&format!("\nTop {} WMAPE:\n", self.top));
        output.push_str(&"-".repeat(64));
        output.push('\n');
        if self.worst.is_empty() {
            output.push_str("  (none)\n");
        } else {
            output.push_str(&format!(
                "{:<14} {:<14} {:<14} {:>12}\n",
                "Product", "Store", "Brand", "WMAPE"
            ));
            for record in &self.worst {
                let wmape = record
                    .wmape
                    .map_or_else(|| "n/a".to_string(), |w| format!("{:.4}", w));
                output.push_str(&format!(
                    "{:<14} {:<14} {:<14} {:>12}\n",
                    record.product_id, record.store_id, record.brand_id, wmape
                ));
            }
        }

        output.push_str(&"=".repeat(64));
        output.push('\n');

        output
    }

    /// Serialize as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ascii_table())
    }
}
