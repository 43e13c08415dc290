//! Builds synthetic DM3 files for tests.

use crate::image_pipeline::dm3::types::{ARRAY_CODE, EncodedType, STRUCT_CODE};

pub enum Tag {
    Group(Vec<(String, Tag)>),
    Scalar(EncodedType, f64),
    Struct(Vec<(EncodedType, f64)>),
    Array(EncodedType, Vec<f64>),
    Text(String),
}

pub fn build_dm3(entries: &[(&str, Tag)], little_endian: bool) -> Vec<u8> {
    let mut body = Vec::new();
    write_group(&mut body, entries.iter().map(|(l, t)| (*l, t)), entries.len(), little_endian);

    let mut out = Vec::new();
    out.extend_from_slice(&3u32.to_be_bytes());
    out.extend_from_slice(&((body.len() + 4) as u32).to_be_bytes());
    out.extend_from_slice(&(little_endian as u32).to_be_bytes());
    out.extend_from_slice(&body);
    out.extend_from_slice(&[0u8; 8]);
    out
}

/// Minimal image file with a thumbnail at `ImageList.0` and the image at
/// `ImageList.1`, optionally carrying display cuts.
pub fn image_file(
    width: u32,
    height: u32,
    data_type: u32,
    element: EncodedType,
    values: Vec<f64>,
    cuts: Option<(f64, f64)>,
    little_endian: bool,
) -> Vec<u8> {
    let image_data = |data: Tag, data_type: u32, w: u32, h: u32| {
        group(vec![
            ("Data", data),
            ("DataType", Tag::Scalar(EncodedType::I32, data_type as f64)),
            (
                "Dimensions",
                group(vec![
                    ("", Tag::Scalar(EncodedType::U32, w as f64)),
                    ("", Tag::Scalar(EncodedType::U32, h as f64)),
                ]),
            ),
        ])
    };

    let thumbnail = group(vec![(
        "ImageData",
        image_data(Tag::Array(EncodedType::U8, vec![0.0; 4]), 6, 2, 2),
    )]);
    let main = group(vec![
        (
            "ImageData",
            image_data(Tag::Array(element, values), data_type, width, height),
        ),
        ("Name", Tag::Text("specimen".to_string())),
    ]);

    let mut entries = vec![("ImageList", group(vec![("", thumbnail), ("", main)]))];
    if let Some((low, high)) = cuts {
        entries.insert(
            0,
            (
                "DocumentObjectList",
                group(vec![(
                    "",
                    group(vec![(
                        "ImageDisplayInfo",
                        group(vec![
                            ("LowLimit", Tag::Scalar(EncodedType::F32, low)),
                            ("HighLimit", Tag::Scalar(EncodedType::F32, high)),
                        ]),
                    )]),
                )]),
            ),
        );
    }
    build_dm3(&entries, little_endian)
}

pub fn group(entries: Vec<(&str, Tag)>) -> Tag {
    Tag::Group(entries.into_iter().map(|(l, t)| (l.to_string(), t)).collect())
}

fn write_group<'t>(
    buf: &mut Vec<u8>,
    entries: impl Iterator<Item = (&'t str, &'t Tag)>,
    count: usize,
    le: bool,
) {
    buf.push(0);
    buf.push(1);
    buf.extend_from_slice(&(count as u32).to_be_bytes());
    for (label, tag) in entries {
        write_entry(buf, label, tag, le);
    }
}

fn write_entry(buf: &mut Vec<u8>, label: &str, tag: &Tag, le: bool) {
    let kind = if matches!(tag, Tag::Group(_)) { 20u8 } else { 21u8 };
    buf.push(kind);
    buf.extend_from_slice(&(label.len() as u16).to_be_bytes());
    buf.extend_from_slice(label.as_bytes());

    if let Tag::Group(children) = tag {
        write_group(
            buf,
            children.iter().map(|(l, t)| (l.as_str(), t)),
            children.len(),
            le,
        );
        return;
    }

    let mut info: Vec<u32> = Vec::new();
    let mut payload = Vec::new();
    match tag {
        Tag::Group(_) => unreachable!(),
        Tag::Scalar(ty, v) => {
            info.push(ty.code());
            write_value(&mut payload, *ty, *v, le);
        }
        Tag::Struct(fields) => {
            info.extend_from_slice(&[STRUCT_CODE, 0, fields.len() as u32]);
            for (ty, v) in fields {
                info.extend_from_slice(&[0, ty.code()]);
                write_value(&mut payload, *ty, *v, le);
            }
        }
        Tag::Array(ty, values) => {
            info.extend_from_slice(&[ARRAY_CODE, ty.code(), values.len() as u32]);
            for v in values {
                write_value(&mut payload, *ty, *v, le);
            }
        }
        Tag::Text(text) => {
            let units: Vec<u16> = text.encode_utf16().collect();
            info.extend_from_slice(&[ARRAY_CODE, EncodedType::U16.code(), units.len() as u32]);
            for u in units {
                write_value(&mut payload, EncodedType::U16, u as f64, le);
            }
        }
    }

    buf.extend_from_slice(b"%%%%");
    buf.extend_from_slice(&(info.len() as u32).to_be_bytes());
    for word in info {
        buf.extend_from_slice(&word.to_be_bytes());
    }
    buf.extend_from_slice(&payload);
}

fn write_value(buf: &mut Vec<u8>, ty: EncodedType, v: f64, le: bool) {
    macro_rules! put {
        ($x:expr) => {
            if le {
                buf.extend_from_slice(&$x.to_le_bytes())
            } else {
                buf.extend_from_slice(&$x.to_be_bytes())
            }
        };
    }
    match ty {
        EncodedType::I16 => put!(v as i16),
        EncodedType::I32 => put!(v as i32),
        EncodedType::U16 => put!(v as u16),
        EncodedType::U32 => put!(v as u32),
        EncodedType::F32 => put!(v as f32),
        EncodedType::F64 => put!(v),
        EncodedType::Bool => buf.push((v != 0.0) as u8),
        EncodedType::I8 => buf.push(v as i8 as u8),
        EncodedType::U8 => buf.push(v as u8),
        EncodedType::I64 => put!(v as i64),
        EncodedType::U64 => put!(v as u64),
    }
}
