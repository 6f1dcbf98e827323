use crate::annotations::bounding_box::BoundingBox;
use crate::annotations::detection::Detection;
use crate::error::Result;
use std::path::Path;
use std::time::Duration;

/// Defines a trait that all tree detectors must follow, whether they run locally or call a
/// remote service.
///
/// Detections must be in the pixel coordinates of the image at `image_path`.
pub trait Detector {
    /// Name the detector's results are reported under.
    fn name(&self) -> &str;

    fn detect(&mut self, image_path: &Path) -> Result<Vec<Detection<BoundingBox>>>;

    /// Minimum pause between requests, for rate limited services.
    fn request_interval(&self) -> Option<Duration> {
        None
    }
}
