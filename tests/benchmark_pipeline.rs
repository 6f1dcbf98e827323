use image::RgbImage;
use std::fs;
use std::path::Path;
use tree_benchmark::Result;
use tree_benchmark::annotations::bounding_box::{BoundingBox, BoundingBoxGeometry};
use tree_benchmark::annotations::detection::Detection;
use tree_benchmark::benchmark::report::{load_results, save_results};
use tree_benchmark::benchmark::runner::BenchmarkRunner;
use tree_benchmark::config::PreprocessConfig;
use tree_benchmark::dataset::annotation_csv::read_annotations;
use tree_benchmark::dataset::tree_dataset::TreeDataset;
use tree_benchmark::evaluation::metrics::summarize;
use tree_benchmark::object_detection::object_detection_model::Detector;
use tree_benchmark::preprocessing::resize::preprocess_dataset;

/// Answers with the stored ground truth for each image, shifted by `offset` pixels.
struct Oracle {
    annotation_dir: std::path::PathBuf,
    offset: f64,
}

impl Detector for Oracle {
    fn name(&self) -> &str {
        "oracle"
    }

    fn detect(&mut self, image_path: &Path) -> Result<Vec<Detection<BoundingBox>>> {
        let stem = image_path.file_stem().unwrap().to_string_lossy();
        let path = self.annotation_dir.join(format!("{stem}.csv"));
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut detections = Vec::new();
        for bbox in read_annotations(&path)? {
            let shifted = BoundingBox::new(
                bbox.left() + self.offset,
                bbox.top() + self.offset,
                bbox.right() + self.offset,
                bbox.bottom() + self.offset,
                bbox.category().to_string(),
            )?;
            detections.push(Detection::new(shifted, 0.8));
        }
        Ok(detections)
    }
}

struct Blind;

impl Detector for Blind {
    fn name(&self) -> &str {
        "blind"
    }

    fn detect(&mut self, _image_path: &Path) -> Result<Vec<Detection<BoundingBox>>> {
        Ok(Vec::new())
    }
}

#[test]
fn preprocess_then_benchmark() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw");
    fs::create_dir_all(&raw).unwrap();
    RgbImage::new(800, 800).save(raw.join("plot_a.png")).unwrap();
    RgbImage::new(400, 400).save(raw.join("plot_b.png")).unwrap();
    let master = dir.path().join("master.csv");
    fs::write(
        &master,
        "image_path,xmin,ymin,xmax,ymax,label\n\
         plot_a.png,0,0,200,200,Alive\n\
         plot_a.png,400,400,600,600,Dead\n\
         plot_b.png,10,10,50,50,Alive\n",
    )
    .unwrap();

    let processed = dir.path().join("processed");
    let summary = preprocess_dataset(&PreprocessConfig {
        raw_image_dir: raw,
        master_csv: master,
        processed_dir: processed.clone(),
        target_size: 400,
    })
    .unwrap();
    assert_eq!((summary.images, summary.annotated), (2, 2));

    let dataset = TreeDataset::new(&processed).unwrap();
    assert_eq!(dataset.len(), 2);

    let detectors: Vec<Box<dyn Detector>> = vec![
        Box::new(Oracle { annotation_dir: dataset.annotation_dir().to_path_buf(), offset: 0.0 }),
        Box::new(Blind),
    ];
    let mut runner = BenchmarkRunner::new(detectors, 0.4);
    let records = runner.run(&dataset).unwrap();
    assert_eq!(records.len(), 4);

    let results = dir.path().join("results/benchmark.json");
    save_results(&records, &results).unwrap();
    let reloaded = load_results(&results).unwrap();
    assert_eq!(reloaded.len(), records.len());
    assert_eq!(reloaded[0].image, "plot_a.png");
    assert_eq!(reloaded[0].true_positives, 2);

    let summaries = summarize(&records);
    assert_eq!(summaries.len(), 2);
    let blind = summaries.iter().find(|s| s.model == "blind").unwrap();
    assert_eq!(blind.precision, 0.0);
    assert_eq!(blind.recall, 0.0);
    let oracle = summaries.iter().find(|s| s.model == "oracle").unwrap();
    assert!(oracle.precision > 0.99 && oracle.precision <= 1.0);
    assert!(oracle.recall > 0.99 && oracle.recall <= 1.0);
}

#[test]
fn shifted_predictions_fall_under_the_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let processed = dir.path().join("processed");
    fs::create_dir_all(processed.join("images")).unwrap();
    fs::create_dir_all(processed.join("annotations")).unwrap();
    RgbImage::new(400, 400).save(processed.join("images/p.png")).unwrap();
    fs::write(
        processed.join("annotations/p.csv"),
        "xmin,ymin,xmax,ymax,label\n0,0,10,10,Alive\n",
    )
    .unwrap();

    let dataset = TreeDataset::new(&processed).unwrap();
    let oracle = |offset| -> Box<dyn Detector> {
        Box::new(Oracle { annotation_dir: dataset.annotation_dir().to_path_buf(), offset })
    };

    // 10x10 boxes shifted diagonally by 5 overlap with IoU 25 / 175.
    let records = BenchmarkRunner::new(vec![oracle(5.0)], 0.4).run(&dataset).unwrap();
    assert_eq!(
        (records[0].true_positives, records[0].false_positives, records[0].false_negatives),
        (0, 1, 1)
    );

    let records = BenchmarkRunner::new(vec![oracle(5.0)], 0.1).run(&dataset).unwrap();
    assert_eq!(records[0].true_positives, 1);
}
