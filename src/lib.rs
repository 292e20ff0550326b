//! Genre filtering, descriptive statistics and a baseline popularity model
//! over a music-track dataset.
//!
//! The pipeline is `load → clean → filter → {rank, correlate, model}`; see
//! [`pipeline::run_pipeline`] for the per-interaction entry point and
//! [`pipeline::TableCache`] for the load-once table.

pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{run_pipeline, DashboardOutput, DashboardParams, TableCache};
