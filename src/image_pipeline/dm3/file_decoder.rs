//! DM3 image extraction on top of the tag tree parser.
//!
//! The primary image lives at `root.ImageList.1` (index 0 is the thumbnail)
//! unless the file only holds one image. Display cuts come from
//! `root.DocumentObjectList.0.ImageDisplayInfo`.

use std::path::Path;

use tracing::{debug, warn};

use crate::image_pipeline::common::error::{ImageError, Result};
use crate::image_pipeline::common::grid::{ImageGrid, SampleType, Samples, ValueRange};
use crate::image_pipeline::dm3::decoder::Dm3Decoder;
use crate::image_pipeline::dm3::tag_tree;
use crate::image_pipeline::dm3::types::{Dm3Image, TagMap, TagValue, primary_image};

const DISPLAY_INFO: &str = "root.DocumentObjectList.0.ImageDisplayInfo";

/// Decodes `.dm3` files read fully into memory.
pub struct Dm3FileDecoder;

impl Dm3FileDecoder {
    pub fn decode_bytes(&self, data: &[u8]) -> Result<Dm3Image> {
        let tree = tag_tree::parse(data)?;
        let tags = tree.tags;

        let image = select_image(&tags)?;
        debug!("Using DM3 image {}", image);

        let data_type = required_u64(&tags, &format!("{}.ImageData.DataType", image))?;
        let sample_type = sample_type_for(data_type)?;

        let dims = format!("{}.ImageData.Dimensions", image);
        if tags.contains_key(&format!("{}.2", dims)) {
            return Err(ImageError::UnsupportedFormat(
                "multi-frame DM3 images".to_string(),
            ));
        }
        let width = required_u64(&tags, &format!("{}.0", dims))? as usize;
        let height = match tags.get(&format!("{}.1", dims)) {
            Some(value) => value.as_u64().ok_or_else(|| {
                ImageError::DecodeError(format!("{}.1 is not an integer", dims))
            })? as usize,
            None => 1,
        };
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidDimensions(width as i64, height as i64));
        }

        let data_path = format!("{}.ImageData.Data", image);
        let (offset, byte_len) = match tags.get(&data_path) {
            Some(TagValue::Array {
                element,
                offset,
                count,
            }) => (*offset, count * element.size()),
            _ => {
                return Err(ImageError::DecodeError(format!(
                    "{} is missing or not an array",
                    data_path
                )));
            }
        };
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(sample_type.size_in_bytes()))
            .ok_or_else(|| ImageError::DecodeError("image size overflows".to_string()))?;
        if byte_len != expected {
            return Err(ImageError::DecodeError(format!(
                "image data holds {} bytes, {}x{} {} needs {}",
                byte_len, width, height, sample_type, expected
            )));
        }
        let bytes = data.get(offset..offset + byte_len).ok_or_else(|| {
            ImageError::DecodeError("image data lies outside the file".to_string())
        })?;

        let samples = decode_samples(bytes, sample_type, tree.little_endian);
        let grid = ImageGrid::new(width, height, samples)?;
        let cuts = display_cuts(&tags);
        debug!(
            "Decoded DM3 image {}x{} {} (cuts: {:?})",
            width, height, sample_type, cuts
        );

        Ok(Dm3Image { grid, cuts, tags })
    }
}

impl Dm3Decoder for Dm3FileDecoder {
    fn decode(&self, path: &Path) -> Result<Dm3Image> {
        let data = std::fs::read(path).map_err(|e| {
            ImageError::InputReadError(format!("{}: {}", path.display(), e))
        })?;
        debug!("Read DM3 file {} ({} bytes)", path.display(), data.len());
        self.decode_bytes(&data)
    }
}

fn select_image(tags: &TagMap) -> Result<&'static str> {
    primary_image(tags)
        .ok_or_else(|| ImageError::DecodeError("no image data in tag tree".to_string()))
}

fn required_u64(tags: &TagMap, path: &str) -> Result<u64> {
    tags.get(path)
        .and_then(TagValue::as_u64)
        .ok_or_else(|| ImageError::DecodeError(format!("missing integer tag {}", path)))
}

/// Maps the DM3 `DataType` code onto a grid sample type.
pub fn sample_type_for(data_type: u64) -> Result<SampleType> {
    let ty = match data_type {
        1 => SampleType::I16,
        2 => SampleType::F32,
        6 | 14 => SampleType::U8,
        7 => SampleType::I32,
        9 => SampleType::I8,
        10 => SampleType::U16,
        11 => SampleType::U32,
        12 => SampleType::F64,
        3 | 13 => {
            return Err(ImageError::UnsupportedFormat(
                "complex-valued DM3 images".to_string(),
            ));
        }
        8 | 23 => {
            return Err(ImageError::UnsupportedFormat("RGB DM3 images".to_string()));
        }
        other => {
            return Err(ImageError::UnsupportedFormat(format!(
                "DM3 data type {}",
                other
            )));
        }
    };
    Ok(ty)
}

fn display_cuts(tags: &TagMap) -> Option<ValueRange> {
    let low = tags.get(&format!("{}.LowLimit", DISPLAY_INFO))?.as_f64()?;
    let high = tags.get(&format!("{}.HighLimit", DISPLAY_INFO))?.as_f64()?;
    match ValueRange::new(low, high) {
        Ok(range) => Some(range),
        Err(e) => {
            warn!("Ignoring display cuts: {}", e);
            None
        }
    }
}

fn decode_samples(bytes: &[u8], ty: SampleType, le: bool) -> Samples {
    match ty {
        SampleType::U8 => Samples::U8(bytes.to_vec()),
        SampleType::I8 => Samples::I8(bytes.iter().map(|&b| b as i8).collect()),
        SampleType::U16 => Samples::U16(words(bytes, le, u16::from_le_bytes, u16::from_be_bytes)),
        SampleType::I16 => Samples::I16(words(bytes, le, i16::from_le_bytes, i16::from_be_bytes)),
        SampleType::U32 => Samples::U32(words(bytes, le, u32::from_le_bytes, u32::from_be_bytes)),
        SampleType::I32 => Samples::I32(words(bytes, le, i32::from_le_bytes, i32::from_be_bytes)),
        SampleType::F32 => Samples::F32(words(bytes, le, f32::from_le_bytes, f32::from_be_bytes)),
        SampleType::F64 => Samples::F64(words(bytes, le, f64::from_le_bytes, f64::from_be_bytes)),
    }
}

fn words<const N: usize, T>(
    bytes: &[u8],
    le: bool,
    from_le: fn([u8; N]) -> T,
    from_be: fn([u8; N]) -> T,
) -> Vec<T> {
    let convert = if le { from_le } else { from_be };
    bytes
        .chunks_exact(N)
        .map(|chunk| {
            let mut word = [0u8; N];
            word.copy_from_slice(chunk);
            convert(word)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::dm3::test_support::{Tag, build_dm3, image_file};
    use crate::image_pipeline::dm3::types::EncodedType;

    #[test]
    fn test_decodes_float_image_with_cuts() {
        let values = vec![0.5, -1.0, 2.25, 8.0, 3.0, 4.5];
        let bytes = image_file(3, 2, 2, EncodedType::F32, values.clone(), Some((1.0, 5.0)), true);

        let image = Dm3FileDecoder.decode_bytes(&bytes).unwrap();

        assert_eq!(image.grid.width(), 3);
        assert_eq!(image.grid.height(), 2);
        assert_eq!(
            image.grid.samples(),
            &Samples::F32(values.iter().map(|&v| v as f32).collect())
        );
        assert_eq!(image.cuts, Some(ValueRange::new(1.0, 5.0).unwrap()));
        assert_eq!(
            image.tags["root.ImageList.1.ImageData.DataType"].as_u64(),
            Some(2)
        );
        assert_eq!(image.tags["root.ImageList.1.Name"].as_str(), Some("specimen"));
        assert_eq!(image.data_type(), Some(2));
    }

    #[test]
    fn test_decodes_big_endian_integer_image() {
        let values = vec![-300.0, 0.0, 12.0, 32767.0];
        let bytes = image_file(2, 2, 1, EncodedType::I16, values, None, false);

        let image = Dm3FileDecoder.decode_bytes(&bytes).unwrap();

        assert_eq!(image.grid.samples(), &Samples::I16(vec![-300, 0, 12, 32767]));
        assert_eq!(image.cuts, None);
    }

    #[test]
    fn test_falls_back_to_single_image() {
        let bytes = build_dm3(
            &[(
                "ImageList",
                Tag::Group(vec![(
                    String::new(),
                    Tag::Group(vec![(
                        "ImageData".to_string(),
                        Tag::Group(vec![
                            ("Data".to_string(), Tag::Array(EncodedType::U16, vec![9.0, 8.0, 7.0])),
                            ("DataType".to_string(), Tag::Scalar(EncodedType::I32, 10.0)),
                            (
                                "Dimensions".to_string(),
                                Tag::Group(vec![(String::new(), Tag::Scalar(EncodedType::U32, 3.0))]),
                            ),
                        ]),
                    )]),
                )]),
            )],
            true,
        );

        let image = Dm3FileDecoder.decode_bytes(&bytes).unwrap();
        assert_eq!((image.grid.width(), image.grid.height()), (3, 1));
        assert_eq!(image.grid.samples(), &Samples::U16(vec![9, 8, 7]));
        assert_eq!(image.data_type(), Some(10));
    }

    #[test]
    fn test_rejects_complex_data() {
        let bytes = image_file(1, 1, 3, EncodedType::F64, vec![0.0], None, true);
        let err = Dm3FileDecoder.decode_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ImageError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_rejects_size_mismatch() {
        // Declares 2x2 u16 but stores three samples.
        let bytes = image_file(2, 2, 10, EncodedType::U16, vec![1.0, 2.0, 3.0], None, true);
        let err = Dm3FileDecoder.decode_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ImageError::DecodeError(_)));
    }

    #[test]
    fn test_missing_image_is_decode_error() {
        let bytes = build_dm3(&[("Other", Tag::Scalar(EncodedType::U8, 1.0))], true);
        let err = Dm3FileDecoder.decode_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ImageError::DecodeError(_)));
    }

    #[test]
    fn test_decode_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.dm3");
        std::fs::write(
            &path,
            image_file(2, 1, 6, EncodedType::U8, vec![4.0, 250.0], None, true),
        )
        .unwrap();

        let image = Dm3FileDecoder.decode(&path).unwrap();
        assert_eq!(image.grid.samples(), &Samples::U8(vec![4, 250]));
    }
}
