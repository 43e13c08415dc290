//! DM3 (Digital Micrograph 3) reading module
//!
//! This module parses the DM3 tag tree and extracts the primary image,
//! its display cuts and the flattened tag map.

mod decoder;
mod file_decoder;
pub mod tag_tree;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use decoder::Dm3Decoder;
pub use file_decoder::Dm3FileDecoder;
pub use types::{ArrayElement, Dm3Image, EncodedType, TagMap, TagTree, TagValue};
