//! Encoder parameter types

use crate::image_pipeline::rescale::BitDepth;

/// Sample layout handed to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelMode {
    /// 8-bit unsigned grayscale
    Gray8,
    /// 16-bit unsigned grayscale
    Gray16,
}

impl PixelMode {
    pub fn for_depth(depth: BitDepth) -> Self {
        match depth {
            BitDepth::Eight => PixelMode::Gray8,
            BitDepth::Sixteen => PixelMode::Gray16,
        }
    }

    pub fn bit_depth(self) -> BitDepth {
        match self {
            PixelMode::Gray8 => BitDepth::Eight,
            PixelMode::Gray16 => BitDepth::Sixteen,
        }
    }
}

/// Output container written by an [`ImageEncoder`](super::ImageEncoder).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Tiff,
    Png,
}
