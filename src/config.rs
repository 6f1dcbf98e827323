//! Settings for the preprocessing and benchmarking commands.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then environment
//! variables prefixed with `TREEBENCH_` (nested keys separated by `__`, for example
//! `TREEBENCH_GEMINI__MODEL`).

use crate::error::{Error, Result};
use crate::evaluation::matching::DEFAULT_IOU_THRESHOLD;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "treebench.toml";
const ENV_PREFIX: &str = "TREEBENCH";

/// Side length, in pixels, of the standardized image patches.
pub const DEFAULT_IMAGE_SIZE: u32 = 400;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub processed_dir: PathBuf,
    pub output_dir: PathBuf,
    pub results_file: String,
    pub iou_threshold: f64,
    pub image_size: u32,
    pub limit: Option<usize>,
    pub onnx: OnnxConfig,
    pub gemini: GeminiConfig,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            processed_dir: PathBuf::from("data/processed"),
            output_dir: PathBuf::from("data/predictions"),
            results_file: "benchmark_results.json".to_string(),
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            image_size: DEFAULT_IMAGE_SIZE,
            limit: None,
            onnx: OnnxConfig::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

impl BenchmarkConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: BenchmarkConfig = layered(path)?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.iou_threshold > 0.0 && self.iou_threshold < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "iou_threshold must be in (0, 1), got {}",
                self.iou_threshold
            )));
        }
        if self.image_size == 0 {
            return Err(Error::InvalidConfig("image_size must be positive".to_string()));
        }
        if self.onnx.input_size == 0 {
            return Err(Error::InvalidConfig("onnx.input_size must be positive".to_string()));
        }
        Ok(())
    }

    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join(&self.results_file)
    }
}

/// The locally run ONNX tree detector.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct OnnxConfig {
    pub name: String,
    pub model_path: PathBuf,
    /// Newline separated class names. Without one every detection is a "Tree".
    pub classes_path: Option<PathBuf>,
    pub input_size: u32,
    pub confidence: f32,
    pub nms_iou_threshold: f64,
}

impl Default for OnnxConfig {
    fn default() -> Self {
        OnnxConfig {
            name: "DeepForest".to_string(),
            model_path: PathBuf::from("data/models/tree_detector.onnx"),
            classes_path: None,
            input_size: 640,
            confidence: 0.1,
            nms_iou_threshold: 0.5,
        }
    }
}

/// The cloud vision-language model.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeminiConfig {
    pub name: String,
    pub model: String,
    pub endpoint: String,
    pub detailed_reasoning: bool,
    pub request_interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            name: "Gemini-ZeroShot".to_string(),
            model: "gemini-1.5-pro".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            detailed_reasoning: false,
            request_interval_secs: 4,
            timeout_secs: 120,
        }
    }
}

impl GeminiConfig {
    pub fn request_interval(&self) -> Duration {
        Duration::from_secs(self.request_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreprocessConfig {
    pub raw_image_dir: PathBuf,
    pub master_csv: PathBuf,
    pub processed_dir: PathBuf,
    pub target_size: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        PreprocessConfig {
            raw_image_dir: PathBuf::from("data/raw/images"),
            master_csv: PathBuf::from("data/raw/csv/testing_live.csv"),
            processed_dir: PathBuf::from("data/processed"),
            target_size: DEFAULT_IMAGE_SIZE,
        }
    }
}

impl PreprocessConfig {
    /// Reads the `[preprocess]` table of the settings file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = layered(path)?;
        let config: PreprocessConfig = match config.get("preprocess") {
            Ok(section) => section,
            Err(config::ConfigError::NotFound(_)) => PreprocessConfig::default(),
            Err(err) => return Err(err.into()),
        };
        if config.target_size == 0 {
            return Err(Error::InvalidConfig("target_size must be positive".to_string()));
        }
        Ok(config)
    }
}

fn layered(path: Option<&Path>) -> Result<Config> {
    let file = match path {
        Some(path) => {
            if !path.exists() {
                return Err(Error::MissingInput(path.to_path_buf()));
            }
            File::from(path).format(FileFormat::Toml).required(true)
        }
        None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
    };
    let config = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    Ok(config)
}
