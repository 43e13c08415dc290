//! Reader for the headered raw `.bin` format.
//!
//! Layout: two reserved bytes, the two dimensions as little-endian `i32`,
//! then `width * height` little-endian `u16` samples. There is no footer.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use tracing::debug;

use crate::image_pipeline::common::error::{ImageError, Result};
use crate::image_pipeline::common::grid::{ImageGrid, Samples};
use crate::image_pipeline::raw::reader::RawImageReader;
use crate::image_pipeline::raw::types::{HEADER_LEN, RawHeader};

const SAMPLE_LEN: usize = 2;

/// Reads `.bin` files into `u16` grids.
pub struct HeaderedRawReader;

impl HeaderedRawReader {
    /// Decodes a header and sample stream from any byte source.
    pub fn read_from<R: Read>(&self, source: R) -> Result<ImageGrid> {
        decode(source, None)
    }

    /// Reads just the header, leaving `source` positioned at the first sample.
    pub fn read_header<R: Read>(&self, source: &mut R) -> Result<RawHeader> {
        let mut bytes = [0u8; HEADER_LEN];
        source.read_exact(&mut bytes).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => ImageError::DecodeError("truncated header".to_string()),
            _ => ImageError::IoError(e),
        })?;
        Ok(RawHeader::parse(&bytes))
    }
}

impl RawImageReader for HeaderedRawReader {
    fn read(&self, path: &Path) -> Result<ImageGrid> {
        let file = File::open(path).map_err(|e| {
            ImageError::InputReadError(format!("{}: {}", path.display(), e))
        })?;
        let file_len = file.metadata().ok().map(|m| m.len());
        debug!("Reading raw binary {} ({:?} bytes)", path.display(), file_len);

        decode(BufReader::new(file), file_len)
    }
}

fn decode<R: Read>(mut source: R, file_len: Option<u64>) -> Result<ImageGrid> {
    let header = HeaderedRawReader.read_header(&mut source)?;
    debug!(
        "Raw header: reserved=0x{:04x}, width={}, height={}",
        header.sample_type_code, header.width, header.height
    );

    if header.width <= 0 || header.height <= 0 {
        return Err(ImageError::InvalidDimensions(
            header.width as i64,
            header.height as i64,
        ));
    }

    // The first declared dimension indexes the outer loop, so it is the row count.
    let rows = header.width as usize;
    let cols = header.height as usize;
    let expected = rows.checked_mul(cols).ok_or_else(|| {
        ImageError::DecodeError(format!(
            "sample count {}x{} overflows",
            header.width, header.height
        ))
    })?;

    // Never reserve more than the file can hold.
    let capacity = match file_len {
        Some(len) => {
            let available = len.saturating_sub(HEADER_LEN as u64) / SAMPLE_LEN as u64;
            expected.min(usize::try_from(available).unwrap_or(usize::MAX))
        }
        None => expected.min(1 << 20),
    };

    let mut samples = Vec::with_capacity(capacity);
    let mut sample = [0u8; SAMPLE_LEN];
    for _ in 0..expected {
        match source.read_exact(&mut sample) {
            Ok(()) => samples.push(u16::from_le_bytes(sample)),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(ImageError::DecodeError(format!(
                    "truncated data: expected {} samples, got {}",
                    expected,
                    samples.len()
                )));
            }
            Err(e) => return Err(ImageError::IoError(e)),
        }
    }

    debug!("Decoded {} samples ({} rows x {} cols)", samples.len(), rows, cols);
    ImageGrid::new(cols, rows, Samples::U16(samples))
}
