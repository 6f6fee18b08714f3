#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/salesfeat/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod pipeline;

// Re-export main types from sub-crates
pub use salesfeat_data as data;
pub use salesfeat_features as features;
pub use salesfeat_output as output;

pub use pipeline::{
    OutputPaths, PipelineConfig, PipelineError, PipelineOutput, run, write_outputs,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
