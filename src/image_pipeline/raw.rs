//! Headered raw binary reading module
//!
//! This module decodes the `.bin` layout: a 10-byte header followed by
//! little-endian `u16` samples.

mod reader;
mod headered_reader;
pub mod types;

pub use reader::RawImageReader;
pub use headered_reader::HeaderedRawReader;
pub use types::{RawHeader, HEADER_LEN};
