//! Linear intensity rescaling into 8 or 16 bit unsigned samples.
//!
//! Every sample `v` becomes `round((v - min) * type_max / (max - min))`,
//! clamped to `[0, type_max]`. Rounding is half away from zero. A flat range
//! (`min == max`) skips the division and clamps `v` itself.

use tracing::debug;

use crate::image_pipeline::common::error::{ImageError, Result};
use crate::image_pipeline::common::grid::{ImageGrid, ValueRange};

/// Output bit depth of a rescaled grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    Eight,
    Sixteen,
}

impl BitDepth {
    pub fn bits(self) -> u32 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 16,
        }
    }

    pub fn type_max(self) -> f64 {
        match self {
            BitDepth::Eight => u8::MAX as f64,
            BitDepth::Sixteen => u16::MAX as f64,
        }
    }
}

/// How the driver picks the range handed to the rescaler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePolicy {
    /// Use the grid's own extrema.
    Computed,
    /// Use externally declared cuts unless they are flat or absent.
    PreferCuts,
}

impl RangePolicy {
    pub fn resolve(self, grid: &ImageGrid, cuts: Option<ValueRange>) -> ValueRange {
        match (self, cuts) {
            (RangePolicy::PreferCuts, Some(cuts)) if !cuts.is_degenerate() => cuts,
            _ => ValueRange::from_grid(grid),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RescaledData {
    U8(Vec<u8>),
    U16(Vec<u16>),
}

/// Grid whose samples are already in the output bit depth.
#[derive(Debug, Clone, PartialEq)]
pub struct RescaledGrid {
    pub width: usize,
    pub height: usize,
    pub data: RescaledData,
}

impl RescaledGrid {
    pub fn bit_depth(&self) -> BitDepth {
        match self.data {
            RescaledData::U8(_) => BitDepth::Eight,
            RescaledData::U16(_) => BitDepth::Sixteen,
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            RescaledData::U8(v) => v.len(),
            RescaledData::U16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct IntensityRescaler;

impl IntensityRescaler {
    pub fn rescale(
        &self,
        grid: ImageGrid,
        range: ValueRange,
        depth: BitDepth,
    ) -> Result<RescaledGrid> {
        if grid.is_empty() {
            return Err(ImageError::InvalidArgument(
                "cannot rescale an empty grid".to_string(),
            ));
        }
        if !range.min().is_finite() || !range.max().is_finite() {
            return Err(ImageError::InvalidArgument(format!(
                "value range {} is not finite",
                range
            )));
        }

        debug!(
            "Rescaling {}x{} {} grid from {} to {} bits",
            grid.width(),
            grid.height(),
            grid.sample_type(),
            range,
            depth.bits()
        );

        let width = grid.width();
        let height = grid.height();
        let map = sample_mapper(range, depth.type_max());
        let samples = grid.into_samples();
        let data = match depth {
            BitDepth::Eight => RescaledData::U8(samples.map_f64(|v| map(v) as u8)),
            BitDepth::Sixteen => RescaledData::U16(samples.map_f64(|v| map(v) as u16)),
        };

        Ok(RescaledGrid {
            width,
            height,
            data,
        })
    }
}

/// Returns the per-sample mapping onto `[0, type_max]`. Its output is always
/// an integral value inside that interval, so the final cast is exact.
///
/// Bounds and samples are halved before subtracting, so the span stays
/// finite for any pair of finite bounds, and the ratio is taken before
/// multiplying by `type_max`.
fn sample_mapper(range: ValueRange, type_max: f64) -> impl Fn(f64) -> f64 {
    let half_min = range.min() / 2.0;
    let half_span = range.max() / 2.0 - half_min;
    let degenerate = range.is_degenerate() || half_span == 0.0;
    move |v: f64| {
        if v.is_nan() {
            return 0.0;
        }
        let scaled = if degenerate {
            v.clamp(0.0, type_max)
        } else {
            (v / 2.0 - half_min) / half_span * type_max
        };
        scaled.round().clamp(0.0, type_max)
    }
}
