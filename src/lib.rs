pub mod config;
pub mod data_loading;
pub mod dedup;
pub mod heart_rate;
pub mod identifiers;
pub mod join;
pub mod output;
pub mod pipeline;
pub mod plots;
pub mod quality;
pub mod records;
pub mod temporal;

pub use config::{ColumnNames, PipelineConfig};
pub use join::AnalysisRow;
pub use pipeline::{run, PipelineOutput};

/// Tag carried by every diagnostic line.
pub const LOG_PREFIX: &str = "[fitness-join]";
