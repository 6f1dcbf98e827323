//! Benchmarks tree detectors on standardized aerial image patches.
//!
//! Raw annotated imagery is resized to square patches ([`preprocessing`]), each detector
//! ([`object_detection`]) runs over the processed [`dataset`], and its detections are matched
//! against ground truth one image at a time ([`evaluation::matching`]) to produce precision
//! and recall per image and per model.

pub mod annotations;
pub mod benchmark;
pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod image_utils;
pub mod object_detection;
pub mod preprocessing;

pub use error::{Error, Result};
