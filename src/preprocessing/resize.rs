//! Standardizes raw annotated imagery to square patches.
//!
//! The raw dataset is a directory of images plus one master annotation table covering all
//! of them. Every image is stretched to `target_size` x `target_size`, and its annotations
//! are rescaled into the new pixel grid and split out into one table per image.

use crate::config::PreprocessConfig;
use crate::dataset::annotation_csv::{AnnotationRow, write_annotations};
use crate::dataset::tree_dataset::{file_name, list_images};
use crate::error::{Error, Result};
use crate::image_utils::image_io::{read_image, resize_exact};
use image::GenericImageView;
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// A row of the master annotation table. Extra columns are ignored.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MasterAnnotation {
    #[serde(alias = "image_name")]
    pub image_path: String,
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    pub label: String,
}

impl MasterAnnotation {
    /// Only the file name part of `image_path` identifies the image.
    pub fn file_name(&self) -> String {
        file_name(Path::new(&self.image_path))
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct PreprocessSummary {
    pub images: usize,
    pub annotated: usize,
}

pub fn read_master_annotations(path: &Path) -> Result<Vec<MasterAnnotation>> {
    if !path.exists() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    let csv_error = |source| Error::Csv { path: path.to_path_buf(), source };
    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<MasterAnnotation>, _>>()
        .map_err(csv_error)
}

/// Maps a box from an `original` sized image onto the `target` square.
///
/// Coordinates are truncated to whole pixels, then clipped to the target image.
pub fn scale_annotation(
    annotation: &MasterAnnotation,
    original: (u32, u32),
    target: u32,
) -> AnnotationRow {
    let scale_x = f64::from(target) / f64::from(original.0);
    let scale_y = f64::from(target) / f64::from(original.1);
    let limit = f64::from(target);
    let scale = |value: f64, factor: f64| (value * factor).trunc().clamp(0.0, limit);
    AnnotationRow {
        xmin: scale(annotation.xmin, scale_x),
        ymin: scale(annotation.ymin, scale_y),
        xmax: scale(annotation.xmax, scale_x),
        ymax: scale(annotation.ymax, scale_y),
        label: annotation.label.clone(),
    }
}

/// Rebuilds the processed dataset from scratch.
pub fn preprocess_dataset(config: &PreprocessConfig) -> Result<PreprocessSummary> {
    let image_out = config.processed_dir.join("images");
    let annotation_out = config.processed_dir.join("annotations");
    for dir in [&image_out, &annotation_out] {
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        fs::create_dir_all(dir)?;
    }

    info!("Loading master annotations from {}", config.master_csv.display());
    let mut by_image: HashMap<String, Vec<MasterAnnotation>> = HashMap::new();
    for annotation in read_master_annotations(&config.master_csv)? {
        by_image.entry(annotation.file_name()).or_default().push(annotation);
    }

    let image_files = list_images(&config.raw_image_dir)?;
    info!("Found {} raw images.", image_files.len());

    let mut summary = PreprocessSummary::default();
    for image_path in &image_files {
        let name = file_name(image_path);
        let image = read_image(image_path)?;
        let original = image.dimensions();
        resize_exact(&image, config.target_size, config.target_size).save(image_out.join(&name))?;
        summary.images += 1;

        let Some(annotations) = by_image.get(&name) else {
            warn!("No annotations found in master CSV for image: {name}");
            continue;
        };
        let rows: Vec<AnnotationRow> = annotations
            .iter()
            .map(|annotation| scale_annotation(annotation, original, config.target_size))
            .collect();
        let stem = image_path.file_stem().unwrap_or_default().to_string_lossy();
        write_annotations(&annotation_out.join(format!("{stem}.csv")), &rows)?;
        summary.annotated += 1;
    }

    info!("Images: {}, annotated: {}", summary.images, summary.annotated);
    Ok(summary)
}
