//! Image processing pipeline module
//!
//! This module provides a structured approach to microscopy image conversion,
//! with separate modules for raw binary and DM3 reading, intensity rescaling,
//! TIFF/PNG encoding, and conversion orchestration.

pub mod common;
pub mod conversions;
pub mod dm3;
pub mod encode;
pub mod raw;
pub mod rescale;

pub use common::{
    ConversionError,
    ImageError,
    ImageGrid,
    Phase,
    Result,
    SampleType,
    Samples,
    ValueRange,
};

pub use raw::{
    HeaderedRawReader,
    RawHeader,
    RawImageReader,
};

pub use dm3::{
    Dm3Decoder,
    Dm3FileDecoder,
    Dm3Image,
    TagMap,
    TagValue,
};

pub use rescale::{
    BitDepth,
    IntensityRescaler,
    RangePolicy,
    RescaledData,
    RescaledGrid,
};

pub use encode::{
    ContainerFormat,
    ImageEncoder,
    PixelMode,
    StandardImageEncoder,
};

pub use conversions::{
    BatchConfig,
    BatchSummary,
    ConversionConfig,
    ConversionConfigBuilder,
    ConversionDriver,
    ConversionJob,
    ConversionReport,
    ConversionState,
    SourceFormat,
    TargetFormat,
};
