//! DM3 tag tree parser.
//!
//! A DM3 file is a 12-byte header (version, length, byte order; all
//! big-endian `u32`) followed by one root tag group. Structural fields are
//! always big-endian; data values use the byte order declared in the header.

use tracing::{debug, trace};

use crate::image_pipeline::common::error::{ImageError, Result};
use crate::image_pipeline::dm3::types::{
    ARRAY_CODE, ArrayElement, EncodedType, STRING_CODE, STRUCT_CODE, TagMap, TagTree, TagValue,
};

const SUPPORTED_VERSION: u32 = 3;
const GROUP_KIND: u8 = 20;
const DATA_KIND: u8 = 21;
const DATA_MARKER: &[u8; 4] = b"%%%%";
const MAX_DEPTH: usize = 64;

pub fn parse(data: &[u8]) -> Result<TagTree> {
    let mut parser = TagTreeParser {
        data,
        pos: 0,
        little_endian: false,
        tags: TagMap::new(),
    };

    let version = parser.read_u32_be()?;
    if version != SUPPORTED_VERSION {
        return Err(ImageError::UnsupportedFormat(format!(
            "DM{} files are not supported",
            version
        )));
    }
    let declared_len = parser.read_u32_be()?;
    parser.little_endian = match parser.read_u32_be()? {
        0 => false,
        1 => true,
        other => {
            return Err(ImageError::DecodeError(format!(
                "invalid byte order flag {}",
                other
            )));
        }
    };
    debug!(
        "DM3 header: declared length {}, little endian data: {}",
        declared_len, parser.little_endian
    );

    parser.read_group("root", 0)?;
    debug!("Parsed {} DM3 tags", parser.tags.len());

    Ok(TagTree {
        version,
        little_endian: parser.little_endian,
        tags: parser.tags,
    })
}

struct TagTreeParser<'a> {
    data: &'a [u8],
    pos: usize,
    little_endian: bool,
    tags: TagMap,
}

impl<'a> TagTreeParser<'a> {
    fn read_group(&mut self, path: &str, depth: usize) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(ImageError::DecodeError(format!(
                "tag groups nested deeper than {} at {}",
                MAX_DEPTH, path
            )));
        }
        let _is_sorted = self.read_u8()?;
        let _is_open = self.read_u8()?;
        let count = self.read_u32_be()?;
        for index in 0..count {
            self.read_entry(path, index, depth)?;
        }
        Ok(())
    }

    fn read_entry(&mut self, parent: &str, index: u32, depth: usize) -> Result<()> {
        let kind = self.read_u8()?;
        let label_len = self.read_u16_be()? as usize;
        let label_bytes = self.take(label_len)?;
        let label = if label_bytes.is_empty() {
            index.to_string()
        } else {
            String::from_utf8_lossy(label_bytes).into_owned()
        };
        let path = format!("{}.{}", parent, label);

        match kind {
            GROUP_KIND => self.read_group(&path, depth + 1),
            DATA_KIND => {
                let value = self.read_data(&path, label == "Data")?;
                trace!("{} = {:?}", path, value);
                self.tags.insert(path, value);
                Ok(())
            }
            other => Err(ImageError::DecodeError(format!(
                "unknown tag kind {} at {}",
                other, path
            ))),
        }
    }

    fn read_data(&mut self, path: &str, is_image_data: bool) -> Result<TagValue> {
        if self.take(4)? != DATA_MARKER {
            return Err(ImageError::DecodeError(format!(
                "missing data marker at {}",
                path
            )));
        }
        let info_count = self.read_u32_be()? as usize;
        if info_count == 0 || info_count > self.remaining() / 4 {
            return Err(ImageError::DecodeError(format!(
                "invalid type info length {} at {}",
                info_count, path
            )));
        }
        let mut words = Vec::with_capacity(info_count);
        for _ in 0..info_count {
            words.push(self.read_u32_be()?);
        }
        let info = InfoWords {
            words: &words,
            path,
        };

        let code = info.get(0)?;
        if let Some(ty) = EncodedType::from_code(code) {
            return self.read_scalar(ty);
        }
        match code {
            STRING_CODE => {
                let len = info.get(1)? as usize;
                let bytes = self.take(len)?;
                Ok(TagValue::String(String::from_utf8_lossy(bytes).into_owned()))
            }
            STRUCT_CODE => {
                let fields = info.struct_fields(1)?;
                let values = fields
                    .into_iter()
                    .map(|ty| self.read_scalar(ty))
                    .collect::<Result<Vec<_>>>()?;
                Ok(TagValue::Struct(values))
            }
            ARRAY_CODE => self.read_array(&info, is_image_data),
            other => Err(ImageError::DecodeError(format!(
                "unknown encoded type {} at {}",
                other, path
            ))),
        }
    }

    fn read_array(&mut self, info: &InfoWords<'_>, is_image_data: bool) -> Result<TagValue> {
        let element_code = info.get(1)?;
        let (element, count_index) = match element_code {
            STRUCT_CODE => {
                let fields = info.struct_fields(2)?;
                let next = 2 + 2 + fields.len() * 2;
                (ArrayElement::Struct(fields), next)
            }
            ARRAY_CODE => {
                return Err(ImageError::UnsupportedFormat(format!(
                    "nested arrays at {}",
                    info.path
                )));
            }
            code => (ArrayElement::Simple(info.encoded_type(code)?), 2),
        };
        let count = info.get(count_index)? as usize;
        let byte_len = count.checked_mul(element.size()).ok_or_else(|| {
            ImageError::DecodeError(format!("array length overflows at {}", info.path))
        })?;

        let offset = self.pos;
        let bytes = self.take(byte_len)?;

        // Text tags are stored as u16 arrays of UTF-16 code units.
        if element == ArrayElement::Simple(EncodedType::U16) && !is_image_data {
            let le = self.little_endian;
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| {
                    if le {
                        u16::from_le_bytes([c[0], c[1]])
                    } else {
                        u16::from_be_bytes([c[0], c[1]])
                    }
                })
                .collect();
            return Ok(TagValue::String(String::from_utf16_lossy(&units)));
        }

        Ok(TagValue::Array {
            element,
            offset,
            count,
        })
    }

    fn read_scalar(&mut self, ty: EncodedType) -> Result<TagValue> {
        let le = self.little_endian;
        let value = match ty {
            EncodedType::I8 => TagValue::Int(self.read_u8()? as i8 as i64),
            EncodedType::U8 => TagValue::UInt(self.read_u8()? as u64),
            EncodedType::Bool => TagValue::Bool(self.read_u8()? != 0),
            EncodedType::I16 => {
                let b = self.array::<2>()?;
                let v = if le { i16::from_le_bytes(b) } else { i16::from_be_bytes(b) };
                TagValue::Int(v as i64)
            }
            EncodedType::U16 => {
                let b = self.array::<2>()?;
                let v = if le { u16::from_le_bytes(b) } else { u16::from_be_bytes(b) };
                TagValue::UInt(v as u64)
            }
            EncodedType::I32 => {
                let b = self.array::<4>()?;
                let v = if le { i32::from_le_bytes(b) } else { i32::from_be_bytes(b) };
                TagValue::Int(v as i64)
            }
            EncodedType::U32 => {
                let b = self.array::<4>()?;
                let v = if le { u32::from_le_bytes(b) } else { u32::from_be_bytes(b) };
                TagValue::UInt(v as u64)
            }
            EncodedType::F32 => {
                let b = self.array::<4>()?;
                let v = if le { f32::from_le_bytes(b) } else { f32::from_be_bytes(b) };
                TagValue::Float(v as f64)
            }
            EncodedType::F64 => {
                let b = self.array::<8>()?;
                let v = if le { f64::from_le_bytes(b) } else { f64::from_be_bytes(b) };
                TagValue::Float(v)
            }
            EncodedType::I64 => {
                let b = self.array::<8>()?;
                let v = if le { i64::from_le_bytes(b) } else { i64::from_be_bytes(b) };
                TagValue::Int(v)
            }
            EncodedType::U64 => {
                let b = self.array::<8>()?;
                let v = if le { u64::from_le_bytes(b) } else { u64::from_be_bytes(b) };
                TagValue::UInt(v)
            }
        };
        Ok(value)
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(ImageError::DecodeError(format!(
                "unexpected end of file at byte {} (wanted {} more)",
                self.pos, len
            )));
        }
        let data = self.data;
        let start = self.pos;
        self.pos += len;
        Ok(&data[start..self.pos])
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn read_u16_be(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array::<2>()?))
    }

    fn read_u32_be(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array::<4>()?))
    }
}

/// Type description words of one data entry.
struct InfoWords<'a> {
    words: &'a [u32],
    path: &'a str,
}

impl InfoWords<'_> {
    fn get(&self, index: usize) -> Result<u32> {
        self.words.get(index).copied().ok_or_else(|| {
            ImageError::DecodeError(format!("truncated type info at {}", self.path))
        })
    }

    fn encoded_type(&self, code: u32) -> Result<EncodedType> {
        EncodedType::from_code(code).ok_or_else(|| {
            ImageError::DecodeError(format!("unknown encoded type {} at {}", code, self.path))
        })
    }

    /// Field types of a struct description starting at `start`
    /// (name length, field count, then a name length and type per field).
    fn struct_fields(&self, start: usize) -> Result<Vec<EncodedType>> {
        let field_count = self.get(start + 1)? as usize;
        if field_count > self.words.len() {
            return Err(ImageError::DecodeError(format!(
                "struct field count {} exceeds type info at {}",
                field_count, self.path
            )));
        }
        (0..field_count)
            .map(|i| self.encoded_type(self.get(start + 2 + i * 2 + 1)?))
            .collect()
    }
}
