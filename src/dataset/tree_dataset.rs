use crate::annotations::bounding_box::BoundingBox;
use crate::dataset::annotation_csv::read_annotations;
use crate::error::{Error, Result};
use log::debug;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Image extensions picked up from dataset directories.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "tif"];

/// Lists the images directly inside `dir`, sorted by path.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::MissingInput(dir.to_path_buf()));
    }
    let mut images = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        let is_image = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext));
        if entry.file_type().is_file() && is_image {
            images.push(entry.into_path());
        }
    }
    images.sort();
    Ok(images)
}

/// One standardized image and the trees annotated in it.
#[derive(Debug)]
pub struct Sample {
    pub image_path: PathBuf,
    pub ground_truth: Vec<BoundingBox>,
}

impl Sample {
    pub fn image_name(&self) -> String {
        file_name(&self.image_path)
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The preprocessed dataset: `images/` holds the patches and `annotations/<stem>.csv` the
/// ground truth for each of them.
#[derive(Debug)]
pub struct TreeDataset {
    image_dir: PathBuf,
    annotation_dir: PathBuf,
    image_files: Vec<PathBuf>,
}

impl TreeDataset {
    pub fn new(processed_dir: &Path) -> Result<Self> {
        let image_dir = processed_dir.join("images");
        let annotation_dir = processed_dir.join("annotations");
        let image_files = list_images(&image_dir)?;
        Ok(TreeDataset { image_dir, annotation_dir, image_files })
    }

    pub fn len(&self) -> usize {
        self.image_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image_files.is_empty()
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn annotation_dir(&self) -> &Path {
        &self.annotation_dir
    }

    /// Where the ground truth for an image is expected.
    pub fn annotation_path(&self, image_path: &Path) -> PathBuf {
        let stem = image_path.file_stem().unwrap_or_default();
        let mut name = stem.to_os_string();
        name.push(".csv");
        self.annotation_dir.join(name)
    }

    /// An image without an annotation file has no trees.
    pub fn ground_truth(&self, image_path: &Path) -> Result<Vec<BoundingBox>> {
        let csv_path = self.annotation_path(image_path);
        if !csv_path.exists() {
            debug!("No annotations for {}", image_path.display());
            return Ok(Vec::new());
        }
        read_annotations(&csv_path)
    }

    /// Loads samples lazily, in image path order.
    pub fn samples(&self) -> impl Iterator<Item = Result<Sample>> + '_ {
        self.image_files.iter().map(|image_path| {
            Ok(Sample {
                image_path: image_path.clone(),
                ground_truth: self.ground_truth(image_path)?,
            })
        })
    }
}
