//! Pipeline conversions module
//!
//! This module contains the per-file conversion driver and the batch runner
//! that fans files out over a worker pool.

pub mod batch;
mod config;
mod driver;
mod formats;
mod timing;


pub use batch::{BatchConfig, BatchSummary, ConversionJob};
pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use driver::{ConversionDriver, ConversionReport, ConversionState};
pub use formats::{SourceFormat, TargetFormat};
pub use timing::{PipelineTimings, StepTiming, Timer};
