use crate::dataset::tree_dataset::TreeDataset;
use crate::error::Result;
use crate::evaluation::matching::match_detections;
use crate::evaluation::metrics::ImageRecord;
use crate::object_detection::object_detection_model::Detector;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, trace, warn};
use std::thread;
use std::time::Duration;

/// Runs every detector on every image of a dataset and scores the results.
pub struct BenchmarkRunner {
    detectors: Vec<Box<dyn Detector>>,
    iou_threshold: f64,
    limit: Option<usize>,
    show_progress: bool,
}

impl BenchmarkRunner {
    pub fn new(detectors: Vec<Box<dyn Detector>>, iou_threshold: f64) -> Self {
        BenchmarkRunner { detectors, iou_threshold, limit: None, show_progress: false }
    }

    /// Stops after `limit` images.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|detector| detector.name()).collect()
    }

    /// The pause before each image, set by the most rate limited detector.
    fn request_interval(&self) -> Option<Duration> {
        self.detectors.iter().filter_map(|detector| detector.request_interval()).max()
    }

    /// One record per image and detector, in image order.
    ///
    /// A detector that fails on an image is scored as if it had found nothing there, so one
    /// bad request costs that image's recall instead of the whole run.
    pub fn run(&mut self, dataset: &TreeDataset) -> Result<Vec<ImageRecord>> {
        let total = self.limit.map_or(dataset.len(), |limit| limit.min(dataset.len()));
        let progress = if self.show_progress {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };
        progress.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        let interval = self.request_interval();

        let mut records = Vec::with_capacity(total * self.detectors.len());
        for sample in dataset.samples().take(total) {
            let sample = sample?;
            let image = sample.image_name();
            progress.set_message(image.clone());

            if let Some(interval) = interval {
                thread::sleep(interval);
            }

            for detector in &mut self.detectors {
                let detections = match detector.detect(&sample.image_path) {
                    Ok(detections) => detections,
                    Err(err) => {
                        warn!("Error {} on {}: {}", detector.name(), image, err);
                        Vec::new()
                    }
                };
                for detection in &detections {
                    trace!("{} on {}: {}", detector.name(), image, detection);
                }
                let result =
                    match_detections(&sample.ground_truth, &detections, self.iou_threshold);
                debug!(
                    "{} on {}: TP={} FP={} FN={}",
                    detector.name(),
                    image,
                    result.true_positives,
                    result.false_positives,
                    result.false_negatives
                );
                records.push(ImageRecord::new(&image, detector.name(), &result));
            }
            progress.inc(1);
        }
        progress.finish_and_clear();
        info!("Scored {} records over {} images", records.len(), total);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::bounding_box::BoundingBox;
    use crate::annotations::detection::Detection;
    use crate::error::Error;
    use std::fs;
    use std::path::Path;

    struct FixedDetector {
        name: &'static str,
        boxes: Vec<[f64; 4]>,
        fail_on: Option<&'static str>,
    }

    impl Detector for FixedDetector {
        fn name(&self) -> &str {
            self.name
        }

        fn detect(&mut self, image_path: &Path) -> Result<Vec<Detection<BoundingBox>>> {
            if self.fail_on.is_some_and(|name| image_path.ends_with(name)) {
                return Err(Error::MalformedResponse("boom".to_string()));
            }
            let mut detections = Vec::new();
            for xyxy in &self.boxes {
                let bbox = BoundingBox::from_xyxy(*xyxy, "Alive".to_string())?;
                detections.push(Detection::new(bbox, 0.9));
            }
            Ok(detections)
        }
    }

    fn dataset() -> (tempfile::TempDir, TreeDataset) {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        let annotations = dir.path().join("annotations");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&annotations).unwrap();
        for name in ["a.png", "b.png", "c.png"] {
            fs::write(images.join(name), b"").unwrap();
            fs::write(
                annotations.join(name.replace(".png", ".csv")),
                "xmin,ymin,xmax,ymax,label\n0,0,10,10,Alive\n50,50,60,60,Dead\n",
            )
            .unwrap();
        }
        let dataset = TreeDataset::new(dir.path()).unwrap();
        (dir, dataset)
    }

    fn fixed(name: &'static str, fail_on: Option<&'static str>) -> Box<dyn Detector> {
        Box::new(FixedDetector { name, boxes: vec![[0.0, 0.0, 10.0, 10.0]], fail_on })
    }

    #[test]
    fn scores_every_detector_on_every_image() {
        let (_dir, dataset) = dataset();
        let mut runner = BenchmarkRunner::new(vec![fixed("one", None), fixed("two", None)], 0.4);
        assert_eq!(runner.detector_names(), ["one", "two"]);
        let records = runner.run(&dataset).unwrap();
        assert_eq!(records.len(), 6);
        assert_eq!(records[0].image, "a.png");
        assert_eq!(records[0].model, "one");
        assert_eq!(records[1].model, "two");
        for record in &records {
            assert_eq!(record.ground_truth_count, 2);
            assert_eq!(
                (record.true_positives, record.false_positives, record.false_negatives),
                (1, 0, 1)
            );
        }
    }

    #[test]
    fn failed_detection_counts_as_empty() {
        let (_dir, dataset) = dataset();
        let mut runner = BenchmarkRunner::new(vec![fixed("flaky", Some("b.png"))], 0.4);
        let records = runner.run(&dataset).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].image, "b.png");
        assert_eq!(records[1].prediction_count, 0);
        assert_eq!(records[1].false_negatives, 2);
        assert_eq!(records[1].precision, 0.0);
        assert_eq!(records[2].true_positives, 1);
    }

    #[test]
    fn limit_caps_the_number_of_images() {
        let (_dir, dataset) = dataset();
        let mut runner = BenchmarkRunner::new(vec![fixed("one", None)], 0.4).with_limit(Some(2));
        let records = runner.run(&dataset).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].image, "b.png");
    }

    #[test]
    fn no_detectors_no_records() {
        let (_dir, dataset) = dataset();
        let mut runner = BenchmarkRunner::new(Vec::new(), 0.4);
        assert!(runner.run(&dataset).unwrap().is_empty());
    }
}
