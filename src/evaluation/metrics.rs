use crate::annotations::bounding_box::{BoundingBoxGeometry, EPSILON};
use crate::evaluation::matching::MatchResult;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scores for one model on one image.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ImageRecord {
    pub image: String,
    pub model: String,
    pub ground_truth_count: usize,
    pub prediction_count: usize,
    #[serde(rename = "TP")]
    pub true_positives: usize,
    #[serde(rename = "FP")]
    pub false_positives: usize,
    #[serde(rename = "FN")]
    pub false_negatives: usize,
    pub precision: f64,
    pub recall: f64,
}

impl ImageRecord {
    pub fn new<T: BoundingBoxGeometry>(
        image: &str,
        model: &str,
        result: &MatchResult<'_, T>,
    ) -> Self {
        let ground_truth_count = result.true_positives + result.false_negatives;
        let prediction_count = result.true_positives + result.false_positives;
        ImageRecord {
            image: image.to_string(),
            model: model.to_string(),
            ground_truth_count,
            prediction_count,
            true_positives: result.true_positives,
            false_positives: result.false_positives,
            false_negatives: result.false_negatives,
            precision: precision(result.true_positives, result.false_positives),
            recall: recall(result.true_positives, result.false_negatives),
        }
    }
}

/// An image with no predictions scores 0 rather than NaN.
pub fn precision(true_positives: usize, false_positives: usize) -> f64 {
    true_positives as f64 / ((true_positives + false_positives) as f64 + EPSILON)
}

pub fn recall(true_positives: usize, false_negatives: usize) -> f64 {
    true_positives as f64 / ((true_positives + false_negatives) as f64 + EPSILON)
}

/// Per-image averages for one model.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelSummary {
    pub model: String,
    pub images: usize,
    pub precision: f64,
    pub recall: f64,
    pub true_positives: f64,
    pub false_positives: f64,
    pub false_negatives: f64,
}

/// Averages every record of a model, models sorted by name.
pub fn summarize(records: &[ImageRecord]) -> Vec<ModelSummary> {
    records
        .iter()
        .into_group_map_by(|record| record.model.as_str())
        .into_iter()
        .sorted_by(|a, b| a.0.cmp(b.0))
        .map(|(model, records)| ModelSummary {
            model: model.to_string(),
            images: records.len(),
            precision: mean(&records, |r| r.precision),
            recall: mean(&records, |r| r.recall),
            true_positives: mean(&records, |r| r.true_positives as f64),
            false_positives: mean(&records, |r| r.false_positives as f64),
            false_negatives: mean(&records, |r| r.false_negatives as f64),
        })
        .collect()
}

fn mean(records: &[&ImageRecord], value: impl Fn(&ImageRecord) -> f64) -> f64 {
    records.iter().map(|record| value(*record)).sum::<f64>() / records.len() as f64
}

/// Renders summaries as a fixed-width table.
pub struct SummaryTable<'a>(pub &'a [ModelSummary]);

impl fmt::Display for SummaryTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .0
            .iter()
            .map(|summary| summary.model.len())
            .chain(std::iter::once("model".len()))
            .max()
            .unwrap_or_default();
        writeln!(
            f,
            "{:<width$}  {:>7}  {:>9}  {:>9}  {:>8}  {:>8}  {:>8}",
            "model", "images", "precision", "recall", "TP", "FP", "FN"
        )?;
        for summary in self.0 {
            writeln!(
                f,
                "{:<width$}  {:>7}  {:>9.4}  {:>9.4}  {:>8.3}  {:>8.3}  {:>8.3}",
                summary.model,
                summary.images,
                summary.precision,
                summary.recall,
                summary.true_positives,
                summary.false_positives,
                summary.false_negatives,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::bounding_box::BoundingBox;
    use crate::annotations::detection::Detection;
    use crate::evaluation::matching::{DEFAULT_IOU_THRESHOLD, match_detections};

    fn record(model: &str, tp: usize, fp: usize, fn_: usize) -> ImageRecord {
        ImageRecord {
            image: "patch.png".to_string(),
            model: model.to_string(),
            ground_truth_count: tp + fn_,
            prediction_count: tp + fp,
            true_positives: tp,
            false_positives: fp,
            false_negatives: fn_,
            precision: precision(tp, fp),
            recall: recall(tp, fn_),
        }
    }

    #[test]
    fn precision_and_recall_with_empty_denominators() {
        assert_eq!(precision(0, 0), 0.0);
        assert_eq!(recall(0, 0), 0.0);
        assert!((precision(3, 1) - 0.75).abs() < 1e-6);
        assert!((recall(1, 3) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn record_from_match_result() {
        let ground_truth = vec![
            BoundingBox::new(0.0, 0.0, 10.0, 10.0, "Alive".to_string()).unwrap(),
            BoundingBox::new(50.0, 50.0, 60.0, 60.0, "Dead".to_string()).unwrap(),
        ];
        let detections = vec![
            Detection::new(ground_truth[0].clone(), 0.9),
            Detection::new(
                BoundingBox::new(200.0, 200.0, 210.0, 210.0, "Alive".to_string()).unwrap(),
                0.4,
            ),
            Detection::new(
                BoundingBox::new(300.0, 0.0, 310.0, 10.0, "Alive".to_string()).unwrap(),
                0.3,
            ),
        ];
        let result = match_detections(&ground_truth, &detections, DEFAULT_IOU_THRESHOLD);
        let record = ImageRecord::new("plot_01.png", "local", &result);
        assert_eq!(record.ground_truth_count, 2);
        assert_eq!(record.prediction_count, 3);
        assert_eq!(
            (record.true_positives, record.false_positives, record.false_negatives),
            (1, 2, 1)
        );
        assert!((record.precision - 1.0 / 3.0).abs() < 1e-6);
        assert!((record.recall - 0.5).abs() < 1e-6);
    }

    #[test]
    fn record_serializes_with_short_count_names() {
        let value = serde_json::to_value(record("local", 2, 1, 0)).unwrap();
        assert_eq!(value["TP"], 2);
        assert_eq!(value["FP"], 1);
        assert_eq!(value["FN"], 0);
        assert_eq!(value["model"], "local");
    }

    #[test]
    fn summaries_average_per_model() {
        let records = vec![
            record("remote", 0, 2, 2),
            record("local", 2, 0, 0),
            record("local", 0, 0, 2),
            record("remote", 1, 1, 1),
        ];
        let summaries = summarize(&records);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].model, "local");
        assert_eq!(summaries[0].images, 2);
        assert!((summaries[0].precision - 0.5).abs() < 1e-6);
        assert!((summaries[0].recall - 0.5).abs() < 1e-6);
        assert_eq!(summaries[0].true_positives, 1.0);
        assert_eq!(summaries[0].false_negatives, 1.0);
        assert_eq!(summaries[1].model, "remote");
        assert_eq!(summaries[1].false_positives, 1.5);
    }

    #[test]
    fn no_records_no_summaries() {
        assert!(summarize(&[]).is_empty());
    }

    #[test]
    fn table_lists_every_model() {
        let summaries = summarize(&[record("local", 1, 0, 0), record("Gemini-ZeroShot", 0, 1, 1)]);
        let table = SummaryTable(&summaries).to_string();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("model"));
        assert!(lines[1].starts_with("Gemini-ZeroShot"));
        assert!(lines[2].starts_with("local"));
    }
}
