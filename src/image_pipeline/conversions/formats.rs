//! Source and target format descriptors

use std::fmt;

use crate::image_pipeline::encode::{ContainerFormat, PixelMode};
use crate::image_pipeline::rescale::BitDepth;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Headered raw binary
    Bin,
    /// Digital Micrograph 3
    Dm3,
}

impl SourceFormat {
    pub fn extension(self) -> &'static str {
        match self {
            SourceFormat::Bin => "bin",
            SourceFormat::Dm3 => "dm3",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.extension())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Tiff,
    Png,
}

impl TargetFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Tiff => "tif",
            TargetFormat::Png => "png",
        }
    }

    pub fn bit_depth(self) -> BitDepth {
        match self {
            TargetFormat::Tiff => BitDepth::Sixteen,
            TargetFormat::Png => BitDepth::Eight,
        }
    }

    pub fn pixel_mode(self) -> PixelMode {
        PixelMode::for_depth(self.bit_depth())
    }

    pub fn container(self) -> ContainerFormat {
        match self {
            TargetFormat::Tiff => ContainerFormat::Tiff,
            TargetFormat::Png => ContainerFormat::Png,
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.extension())
    }
}
