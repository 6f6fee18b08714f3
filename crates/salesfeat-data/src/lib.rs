#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/salesfeat/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{DataError, Result};
pub use loader::{InputPaths, RawTables, TableKind, load_tables};
pub use schema::{KeyPolicy, validate_schema, validate_unique_keys};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
