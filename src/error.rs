use crate::annotations::bounding_box::BoundingBoxError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read or write {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("invalid annotation in {path} (row {row}): {source}")]
    InvalidAnnotation {
        path: PathBuf,
        row: usize,
        #[source]
        source: BoundingBoxError,
    },
    #[error(transparent)]
    BoundingBox(#[from] BoundingBoxError),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("{0} does not exist, or cannot be read")]
    MissingInput(PathBuf),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unexpected model output: {0}")]
    InvalidModelOutput(String),
    #[error("malformed detector response: {0}")]
    MalformedResponse(String),
}
