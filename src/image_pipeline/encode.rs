//! Image encoding module
//!
//! This module writes rescaled grayscale grids as single-frame TIFF or PNG files.

mod writer;
mod standard_encoder;
pub mod types;

pub use writer::ImageEncoder;
pub use standard_encoder::StandardImageEncoder;
pub use types::{ContainerFormat, PixelMode};
