//! Common utilities module
//!
//! This module contains the error types and grid types shared across the image pipeline.

pub mod error;
pub mod grid;

pub use error::{ConversionError, ImageError, Phase, Result};
pub use grid::{ImageGrid, SampleType, Samples, ValueRange};
