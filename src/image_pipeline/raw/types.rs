//! Raw binary header types

/// Size of the fixed little-endian header preceding the sample stream.
pub const HEADER_LEN: usize = 10;

/// Decoded 10-byte header of a `.bin` image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawHeader {
    /// Leading two bytes. Their meaning is undocumented, so they are carried opaquely.
    pub sample_type_code: u16,
    /// First declared dimension; drives the outer (row) loop of the sample stream.
    pub width: i32,
    /// Second declared dimension; drives the inner (column) loop.
    pub height: i32,
}

impl RawHeader {
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> Self {
        Self {
            sample_type_code: u16::from_le_bytes([bytes[0], bytes[1]]),
            width: i32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]),
            height: i32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]),
        }
    }
}
