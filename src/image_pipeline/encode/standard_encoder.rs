use std::io::{Cursor, Write};
use std::path::Path;

use tracing::debug;

use crate::image_pipeline::common::error::{ImageError, Result};
use crate::image_pipeline::encode::types::{ContainerFormat, PixelMode};
use crate::image_pipeline::encode::writer::ImageEncoder;
use crate::image_pipeline::rescale::{RescaledData, RescaledGrid};

/// TIFF and PNG encoder backed by the `tiff` and `png` crates.
pub struct StandardImageEncoder;

impl StandardImageEncoder {
    /// Encodes `grid` into an in-memory container.
    pub fn encode(
        &self,
        grid: &RescaledGrid,
        pixel_mode: PixelMode,
        format: ContainerFormat,
    ) -> Result<Vec<u8>> {
        if pixel_mode.bit_depth() != grid.bit_depth() {
            return Err(ImageError::EncodeError(format!(
                "pixel mode {:?} does not match {}-bit samples",
                pixel_mode,
                grid.bit_depth().bits()
            )));
        }
        let width = u32::try_from(grid.width)
            .map_err(|_| ImageError::InvalidDimensions(grid.width as i64, grid.height as i64))?;
        let height = u32::try_from(grid.height)
            .map_err(|_| ImageError::InvalidDimensions(grid.width as i64, grid.height as i64))?;

        debug!("Encoding {:?} image: {}x{} {:?}", format, width, height, pixel_mode);
        let buffer = match format {
            ContainerFormat::Tiff => encode_tiff(&grid.data, width, height)?,
            ContainerFormat::Png => encode_png(&grid.data, width, height)?,
        };
        debug!("{:?} encoding complete, {} bytes", format, buffer.len());
        Ok(buffer)
    }
}

impl ImageEncoder for StandardImageEncoder {
    fn write(
        &self,
        path: &Path,
        grid: &RescaledGrid,
        pixel_mode: PixelMode,
        format: ContainerFormat,
    ) -> Result<()> {
        let buffer = self.encode(grid, pixel_mode, format)?;

        let mut output = std::fs::File::create(path).map_err(|e| {
            ImageError::OutputWriteError(format!("{}: {}", path.display(), e))
        })?;
        output.write_all(&buffer)?;
        output.flush()?;
        Ok(())
    }
}

fn encode_tiff(data: &RescaledData, width: u32, height: u32) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut encoder = tiff::encoder::TiffEncoder::new(Cursor::new(&mut buffer))
            .map_err(|e| ImageError::EncodeError(e.to_string()))?;

        let written = match data {
            RescaledData::U16(samples) => {
                encoder.write_image::<tiff::encoder::colortype::Gray16>(width, height, samples)
            }
            RescaledData::U8(samples) => {
                encoder.write_image::<tiff::encoder::colortype::Gray8>(width, height, samples)
            }
        };
        written.map_err(|e| ImageError::EncodeError(e.to_string()))?;
    }
    Ok(buffer)
}

fn encode_png(data: &RescaledData, width: u32, height: u32) -> Result<Vec<u8>> {
    let (depth, bytes) = match data {
        RescaledData::U8(samples) => (png::BitDepth::Eight, samples.clone()),
        // PNG stores 16-bit samples big-endian.
        RescaledData::U16(samples) => (
            png::BitDepth::Sixteen,
            samples.iter().flat_map(|s| s.to_be_bytes()).collect(),
        ),
    };

    let mut buffer = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buffer, width, height);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(depth);
        let mut writer = encoder
            .write_header()
            .map_err(|e| ImageError::EncodeError(e.to_string()))?;
        writer
            .write_image_data(&bytes)
            .map_err(|e| ImageError::EncodeError(e.to_string()))?;
        writer
            .finish()
            .map_err(|e| ImageError::EncodeError(e.to_string()))?;
    }
    Ok(buffer)
}
