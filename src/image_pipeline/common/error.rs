use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Failed to encode image: {0}")]
    EncodeError(String),

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(i64, i64),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ImageError>;

/// Stage of a single file conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Decoding,
    Rescaling,
    Encoding,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Decoding => "Decoding",
            Phase::Rescaling => "Rescaling",
            Phase::Encoding => "Encoding",
        };
        f.pad(name)
    }
}

/// Failure of one file's conversion, tagged with the phase it happened in.
#[derive(Error, Debug)]
#[error("{phase} failed for {}: {cause}", .path.display())]
pub struct ConversionError {
    pub phase: Phase,
    pub path: PathBuf,
    #[source]
    pub cause: ImageError,
}

impl ConversionError {
    pub fn new(phase: Phase, path: impl Into<PathBuf>, cause: ImageError) -> Self {
        Self {
            phase,
            path: path.into(),
            cause,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_error_display_names_phase_and_path() {
        let err = ConversionError::new(
            Phase::Encoding,
            "out/a.tif",
            ImageError::EncodeError("disk full".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "Encoding failed for out/a.tif: Failed to encode image: disk full"
        );
    }

    #[test]
    fn test_conversion_error_exposes_cause_as_source() {
        let err = ConversionError::new(
            Phase::Decoding,
            "a.bin",
            ImageError::DecodeError("truncated header".to_string()),
        );
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("Failed to decode image: truncated header"));
    }
}
