use std::path::Path;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::encode::types::{ContainerFormat, PixelMode};
use crate::image_pipeline::rescale::RescaledGrid;

pub trait ImageEncoder {
    fn write(
        &self,
        path: &Path,
        grid: &RescaledGrid,
        pixel_mode: PixelMode,
        format: ContainerFormat,
    ) -> Result<()>;
}
