use crate::annotations::bounding_box::BoundingBoxGeometry;
use std::fmt;

/// Confidence assigned to detections from models that do not report one.
pub const DEFAULT_CONFIDENCE: f64 = 1.0;

/// A detection is what is produced as output from an object detection model.
///
/// A detection is any annotation combined with a confidence score: a probability value that
/// encodes the model's belief that the detection is true.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection<T: BoundingBoxGeometry> {
    pub annotation: T,
    pub confidence: f64,
}

impl<T: BoundingBoxGeometry> Detection<T> {
    pub fn new(annotation: T, confidence: f64) -> Self {
        Detection { annotation, confidence }
    }

    /// For detectors that only return boxes.
    pub fn without_confidence(annotation: T) -> Self {
        Detection::new(annotation, DEFAULT_CONFIDENCE)
    }
}

impl<T: BoundingBoxGeometry + fmt::Display> fmt::Display for Detection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Detection {{ {}, confidence: {:.3} }}", self.annotation, self.confidence)
    }
}
