//! In-memory image grid types shared by the readers, the rescaler and the encoders.

use std::fmt;

use crate::image_pipeline::common::error::{ImageError, Result};

/// Numeric type of every sample in an [`ImageGrid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl SampleType {
    pub fn size_in_bytes(self) -> usize {
        match self {
            SampleType::U8 | SampleType::I8 => 1,
            SampleType::U16 | SampleType::I16 => 2,
            SampleType::U32 | SampleType::I32 | SampleType::F32 => 4,
            SampleType::F64 => 8,
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleType::U8 => "u8",
            SampleType::I8 => "i8",
            SampleType::U16 => "u16",
            SampleType::I16 => "i16",
            SampleType::U32 => "u32",
            SampleType::I32 => "i32",
            SampleType::F32 => "f32",
            SampleType::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// Row-major sample storage, one variant per [`SampleType`].
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::U8(v) => v.len(),
            Samples::I8(v) => v.len(),
            Samples::U16(v) => v.len(),
            Samples::I16(v) => v.len(),
            Samples::U32(v) => v.len(),
            Samples::I32(v) => v.len(),
            Samples::F32(v) => v.len(),
            Samples::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            Samples::U8(_) => SampleType::U8,
            Samples::I8(_) => SampleType::I8,
            Samples::U16(_) => SampleType::U16,
            Samples::I16(_) => SampleType::I16,
            Samples::U32(_) => SampleType::U32,
            Samples::I32(_) => SampleType::I32,
            Samples::F32(_) => SampleType::F32,
            Samples::F64(_) => SampleType::F64,
        }
    }

    /// Applies `f` to every sample widened to `f64`, in storage order.
    pub fn map_f64<T>(&self, f: impl FnMut(f64) -> T) -> Vec<T> {
        match self {
            Samples::U8(v) => widen(v, f),
            Samples::I8(v) => widen(v, f),
            Samples::U16(v) => widen(v, f),
            Samples::I16(v) => widen(v, f),
            Samples::U32(v) => widen(v, f),
            Samples::I32(v) => widen(v, f),
            Samples::F32(v) => widen(v, f),
            Samples::F64(v) => widen(v, f),
        }
    }

    pub fn for_each_f64(&self, mut f: impl FnMut(f64)) {
        match self {
            Samples::U8(v) => v.iter().for_each(|&s| f(s.into())),
            Samples::I8(v) => v.iter().for_each(|&s| f(s.into())),
            Samples::U16(v) => v.iter().for_each(|&s| f(s.into())),
            Samples::I16(v) => v.iter().for_each(|&s| f(s.into())),
            Samples::U32(v) => v.iter().for_each(|&s| f(s.into())),
            Samples::I32(v) => v.iter().for_each(|&s| f(s.into())),
            Samples::F32(v) => v.iter().for_each(|&s| f(s.into())),
            Samples::F64(v) => v.iter().for_each(|&s| f(s)),
        }
    }

    /// Sample at flat index `index`, widened to `f64`.
    #[cfg(test)]
    pub(crate) fn get_f64(&self, index: usize) -> Option<f64> {
        match self {
            Samples::U8(v) => v.get(index).map(|&s| s.into()),
            Samples::I8(v) => v.get(index).map(|&s| s.into()),
            Samples::U16(v) => v.get(index).map(|&s| s.into()),
            Samples::I16(v) => v.get(index).map(|&s| s.into()),
            Samples::U32(v) => v.get(index).map(|&s| s.into()),
            Samples::I32(v) => v.get(index).map(|&s| s.into()),
            Samples::F32(v) => v.get(index).map(|&s| s.into()),
            Samples::F64(v) => v.get(index).copied(),
        }
    }
}

fn widen<S, T>(values: &[S], mut f: impl FnMut(f64) -> T) -> Vec<T>
where
    S: Copy + Into<f64>,
{
    values.iter().map(|&v| f(v.into())).collect()
}

/// A decoded 2D image, `width` samples per row and `height` rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGrid {
    width: usize,
    height: usize,
    samples: Samples,
}

impl ImageGrid {
    pub fn new(width: usize, height: usize, samples: Samples) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidDimensions(width as i64, height as i64));
        }
        let expected = width.checked_mul(height).ok_or_else(|| {
            ImageError::InvalidArgument(format!("grid {}x{} overflows", width, height))
        })?;
        if samples.len() != expected {
            return Err(ImageError::InvalidArgument(format!(
                "grid {}x{} needs {} samples, got {}",
                width,
                height,
                expected,
                samples.len()
            )));
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; construction rejects empty grids.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_type(&self) -> SampleType {
        self.samples.sample_type()
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn into_samples(self) -> Samples {
        self.samples
    }

    #[cfg(test)]
    pub(crate) fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.samples.get_f64(row * self.width + col)
    }
}

/// Inclusive `(min, max)` bounds for the linear rescale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    min: f64,
    max: f64,
}

impl ValueRange {
    /// Builds a range from two bounds given in either order.
    pub fn new(a: f64, b: f64) -> Result<Self> {
        if !a.is_finite() || !b.is_finite() {
            return Err(ImageError::InvalidArgument(format!(
                "value range bounds must be finite, got ({}, {})",
                a, b
            )));
        }
        Ok(Self {
            min: a.min(b),
            max: a.max(b),
        })
    }

    /// True extrema of the finite samples in `grid`.
    ///
    /// A grid with no finite sample yields the flat range `(0, 0)`.
    pub fn from_grid(grid: &ImageGrid) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        grid.samples().for_each_f64(|v| {
            if v.is_finite() {
                min = min.min(v);
                max = max.max(v);
            }
        });
        if min > max {
            return Self { min: 0.0, max: 0.0 };
        }
        Self { min, max }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}
