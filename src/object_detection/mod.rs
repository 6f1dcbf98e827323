pub mod gemini_detector;
pub mod object_detection_model;
pub mod object_detection_utils;
pub mod onnx_tree_detector;
pub mod ort_inference_session;
