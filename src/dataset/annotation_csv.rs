//! Per-image annotation tables with the columns `xmin,ymin,xmax,ymax,label`.

use crate::annotations::bounding_box::{BoundingBox, BoundingBoxGeometry};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AnnotationRow {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    pub label: String,
}

impl AnnotationRow {
    pub fn from_bounding_box(bbox: &BoundingBox) -> Self {
        let (xmin, ymin, xmax, ymax) = bbox.as_xyxy();
        AnnotationRow { xmin, ymin, xmax, ymax, label: bbox.category().to_string() }
    }
}

/// Reads ground truth boxes from an annotation table.
///
/// A row with a missing or non-numeric coordinate fails the whole file instead of being
/// read as zero.
pub fn read_annotations(path: &Path) -> Result<Vec<BoundingBox>> {
    let csv_error = |source| Error::Csv { path: path.to_path_buf(), source };
    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
    let mut boxes = Vec::new();
    for (index, row) in reader.deserialize::<AnnotationRow>().enumerate() {
        let row = row.map_err(csv_error)?;
        let bbox = BoundingBox::new(row.xmin, row.ymin, row.xmax, row.ymax, row.label)
            .map_err(|source| Error::InvalidAnnotation {
                path: path.to_path_buf(),
                // +2 for the header and 1-based numbering.
                row: index + 2,
                source,
            })?;
        boxes.push(bbox);
    }
    Ok(boxes)
}

pub fn write_annotations(path: &Path, rows: &[AnnotationRow]) -> Result<()> {
    let csv_error = |source| Error::Csv { path: path.to_path_buf(), source };
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}
