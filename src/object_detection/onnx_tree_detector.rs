use crate::annotations::bounding_box::BoundingBox;
use crate::annotations::detection::Detection;
use crate::config::OnnxConfig;
use crate::error::{Error, Result};
use crate::image_utils::image_conversion::convert_rgb_image_to_owned_array;
use crate::image_utils::image_io::{read_image, resize_exact};
use crate::object_detection::object_detection_model::Detector;
use crate::object_detection::object_detection_utils::{
    non_maximum_suppression, read_classes_txt_file,
};
use crate::object_detection::ort_inference_session::OrtInferenceSession;
use image::GenericImageView;
use log::debug;
use ndarray::{ArrayView2, Axis};
use ort::value::TensorRef;
use std::path::Path;

const INPUT_NAME: &str = "images";
const OUTPUT_NAME: &str = "output0";

/// A single-stage ONNX detector with a YOLO style head.
///
/// The model takes a `(1, 3, input_size, input_size)` image and produces a
/// `(1, 4 + classes, anchors)` tensor where each anchor holds a centre-x, centre-y, width,
/// height box in input pixels followed by one score per class.
pub struct OnnxTreeDetector {
    ort_session: OrtInferenceSession,
    class_names: Vec<String>,
    input_size: u32,
    confidence: f32,
    nms_iou_threshold: f64,
    model_name: String,
}

impl OnnxTreeDetector {
    pub fn new(config: &OnnxConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(Error::MissingInput(config.model_path.clone()));
        }
        let class_names = match &config.classes_path {
            Some(path) => read_classes_txt_file(path)?,
            None => vec!["Tree".to_string()],
        };
        let ort_session = OrtInferenceSession::new(&config.model_path)?;
        Ok(OnnxTreeDetector {
            ort_session,
            class_names,
            input_size: config.input_size,
            confidence: config.confidence,
            nms_iou_threshold: config.nms_iou_threshold,
            model_name: config.name.clone(),
        })
    }
}

impl Detector for OnnxTreeDetector {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn detect(&mut self, image_path: &Path) -> Result<Vec<Detection<BoundingBox>>> {
        let image = read_image(image_path)?;
        let (width, height) = image.dimensions();
        let resized = resize_exact(&image, self.input_size, self.input_size).into_rgb8();
        let input_array = convert_rgb_image_to_owned_array(&resized);

        let outputs = self
            .ort_session
            .session
            .run(ort::inputs![INPUT_NAME => TensorRef::from_array_view(&input_array)?])?;
        let output = outputs[OUTPUT_NAME].try_extract_array::<f32>()?;
        if output.ndim() != 3 || output.shape()[0] != 1 {
            return Err(Error::InvalidModelOutput(format!(
                "expected a (1, 4 + classes, anchors) tensor, got shape {:?}",
                output.shape()
            )));
        }
        let output = output.index_axis(Axis(0), 0);
        let output = output
            .into_dimensionality::<ndarray::Ix2>()
            .map_err(|err| Error::InvalidModelOutput(err.to_string()))?;

        let scale = (
            f64::from(width) / f64::from(self.input_size),
            f64::from(height) / f64::from(self.input_size),
        );
        let detections = decode_predictions(
            output.t(),
            &self.class_names,
            self.confidence,
            scale,
            (f64::from(width), f64::from(height)),
        )?;
        let detections = non_maximum_suppression(detections, self.nms_iou_threshold);
        debug!("{} found {} trees in {}", self.model_name, detections.len(), image_path.display());
        Ok(detections)
    }
}

/// Turns raw anchor rows into boxes in image pixels.
///
/// `rows` is `(anchors, 4 + classes)`. Each anchor keeps only its best class, and anchors
/// whose best score is below `confidence` are dropped. Boxes are scaled by `scale` and
/// clamped to an image of size `bounds`.
pub fn decode_predictions(
    rows: ArrayView2<'_, f32>,
    class_names: &[String],
    confidence: f32,
    scale: (f64, f64),
    bounds: (f64, f64),
) -> Result<Vec<Detection<BoundingBox>>> {
    if rows.ncols() <= 4 {
        return Err(Error::InvalidModelOutput(format!(
            "expected at least one class score per anchor, got {} values",
            rows.ncols()
        )));
    }
    let mut detections: Vec<Detection<BoundingBox>> = Vec::new();
    for row in rows.axis_iter(Axis(0)) {
        let Some((class_id, prob)) = row
            .iter()
            .skip(4) // skips bounding box coords.
            .copied()
            .enumerate()
            .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best })
        else {
            continue;
        };
        if prob < confidence {
            continue;
        }
        let label = match class_names.get(class_id) {
            Some(v) => v.clone(),
            None => class_id.to_string(),
        };
        let x = f64::from(row[0]) * scale.0;
        let y = f64::from(row[1]) * scale.1;
        let w = f64::from(row[2]) * scale.0;
        let h = f64::from(row[3]) * scale.1;
        let bbox = BoundingBox::new(
            (x - w / 2.0).clamp(0.0, bounds.0),
            (y - h / 2.0).clamp(0.0, bounds.1),
            (x + w / 2.0).clamp(0.0, bounds.0),
            (y + h / 2.0).clamp(0.0, bounds.1),
            label,
        )?;
        detections.push(Detection::new(bbox, f64::from(prob)));
    }
    Ok(detections)
}
