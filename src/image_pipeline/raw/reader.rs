use std::path::Path;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::common::grid::ImageGrid;

pub trait RawImageReader {
    fn read(&self, path: &Path) -> Result<ImageGrid>;
}
