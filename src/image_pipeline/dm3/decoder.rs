use std::path::Path;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::dm3::types::Dm3Image;

pub trait Dm3Decoder {
    fn decode(&self, path: &Path) -> Result<Dm3Image>;
}
