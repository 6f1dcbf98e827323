use crate::error::{Error, Result};
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::Path;

pub fn read_image(filepath: &Path) -> Result<DynamicImage> {
    if !filepath.exists() {
        return Err(Error::MissingInput(filepath.to_path_buf()));
    }
    Ok(image::open(filepath)?)
}

/// Stretches an image to exactly `width` x `height` with a Lanczos filter.
pub fn resize_exact(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    image.resize_exact(width, height, FilterType::Lanczos3)
}
