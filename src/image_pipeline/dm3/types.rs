//! DM3 tag tree types

use std::collections::BTreeMap;

use crate::image_pipeline::common::grid::{ImageGrid, ValueRange};

pub const STRUCT_CODE: u32 = 15;
pub const STRING_CODE: u32 = 18;
pub const ARRAY_CODE: u32 = 20;

/// Fixed-width value types a DM3 data entry can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedType {
    I16,
    I32,
    U16,
    U32,
    F32,
    F64,
    Bool,
    I8,
    U8,
    I64,
    U64,
}

impl EncodedType {
    pub fn from_code(code: u32) -> Option<Self> {
        let ty = match code {
            2 => EncodedType::I16,
            3 => EncodedType::I32,
            4 => EncodedType::U16,
            5 => EncodedType::U32,
            6 => EncodedType::F32,
            7 => EncodedType::F64,
            8 => EncodedType::Bool,
            9 => EncodedType::I8,
            10 => EncodedType::U8,
            11 => EncodedType::I64,
            12 => EncodedType::U64,
            _ => return None,
        };
        Some(ty)
    }

    pub fn code(self) -> u32 {
        match self {
            EncodedType::I16 => 2,
            EncodedType::I32 => 3,
            EncodedType::U16 => 4,
            EncodedType::U32 => 5,
            EncodedType::F32 => 6,
            EncodedType::F64 => 7,
            EncodedType::Bool => 8,
            EncodedType::I8 => 9,
            EncodedType::U8 => 10,
            EncodedType::I64 => 11,
            EncodedType::U64 => 12,
        }
    }

    pub fn size(self) -> usize {
        match self {
            EncodedType::Bool | EncodedType::I8 | EncodedType::U8 => 1,
            EncodedType::I16 | EncodedType::U16 => 2,
            EncodedType::I32 | EncodedType::U32 | EncodedType::F32 => 4,
            EncodedType::F64 | EncodedType::I64 | EncodedType::U64 => 8,
        }
    }
}

/// Element layout of an array entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayElement {
    Simple(EncodedType),
    Struct(Vec<EncodedType>),
}

impl ArrayElement {
    pub fn size(&self) -> usize {
        match self {
            ArrayElement::Simple(ty) => ty.size(),
            ArrayElement::Struct(fields) => fields.iter().map(|f| f.size()).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    String(String),
    Struct(Vec<TagValue>),
    /// Array payload left in the file buffer; `offset` is absolute.
    Array {
        element: ArrayElement,
        offset: usize,
        count: usize,
    },
}

impl TagValue {
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            TagValue::Int(v) => Some(v as f64),
            TagValue::UInt(v) => Some(v as f64),
            TagValue::Float(v) => Some(v),
            TagValue::Bool(v) => Some(if v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            TagValue::Int(v) => u64::try_from(v).ok(),
            TagValue::UInt(v) => Some(v),
            TagValue::Float(v) if v >= 0.0 && v.fract() == 0.0 => Some(v as u64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Dotted tag path (`root.ImageList.1.ImageData.DataType`) to value.
pub type TagMap = BTreeMap<String, TagValue>;

/// Parsed tag tree plus the file-level header fields.
#[derive(Debug, Clone)]
pub struct TagTree {
    pub version: u32,
    pub little_endian: bool,
    pub tags: TagMap,
}

/// Image extracted from a DM3 file.
#[derive(Debug, Clone)]
pub struct Dm3Image {
    pub grid: ImageGrid,
    /// Display low/high limits, when the file declares both.
    pub cuts: Option<ValueRange>,
    pub tags: TagMap,
}

impl Dm3Image {
    /// Raw `ImageData.DataType` code of the image that was decoded.
    pub fn data_type(&self) -> Option<u64> {
        let prefix = primary_image(&self.tags)?;
        self.tags
            .get(&format!("{}.ImageData.DataType", prefix))
            .and_then(TagValue::as_u64)
    }
}

/// Tag prefix of the main image. Index 0 is the thumbnail when a file
/// carries two images.
pub fn primary_image(tags: &TagMap) -> Option<&'static str> {
    ["root.ImageList.1", "root.ImageList.0"]
        .into_iter()
        .find(|prefix| tags.contains_key(&format!("{}.ImageData.Data", prefix)))
}
