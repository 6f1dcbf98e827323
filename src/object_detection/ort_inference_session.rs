use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use std::path::Path;

/// An onnxruntime inference session.
///
/// The local detectors in this project are wrappers around an ONNX inference session that
/// handles running the model on hardware.
pub struct OrtInferenceSession {
    pub session: Session,
}

impl OrtInferenceSession {
    pub fn new(model_path: &Path) -> ort::Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)?;
        Ok(Self { session })
    }
}
