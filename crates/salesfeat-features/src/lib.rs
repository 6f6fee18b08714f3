#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/salesfeat/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod filter;
pub mod join;
pub mod merge;
pub mod window;
pub mod wmape;

pub use error::{FeatureError, Result};
pub use filter::{DateRange, filter_date_range};
pub use join::{parse_date, resolve_transactions};
pub use merge::{feature_columns, merge_features};
pub use window::{
    Granularity, GranularityFeatures, WindowConfig, WindowFeatureEngine, compute_all,
};
pub use wmape::{WMAPE_COLUMN, top_wmape, wmape_by_group};
