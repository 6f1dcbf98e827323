use crate::annotations::bounding_box::{BoundingBoxGeometry, intersection_over_union};
use crate::annotations::detection::Detection;

/// IoU a detection needs with a ground truth box to count as finding it.
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.4;

/// A ground truth box paired with the detection that claimed it.
#[derive(Debug, PartialEq)]
pub struct Match<'a, T: BoundingBoxGeometry> {
    pub ground_truth: &'a T,
    pub detection: &'a Detection<T>,
    pub iou: f64,
}

/// The outcome of matching one image's detections against its ground truth.
///
/// `matches` is in the order the detections were processed, i.e. by descending confidence.
#[derive(Debug, PartialEq)]
pub struct MatchResult<'a, T: BoundingBoxGeometry> {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub matches: Vec<Match<'a, T>>,
}

/// Greedily assigns detections to ground truth boxes, one to one.
///
/// Detections are visited from the most to the least confident. Each one claims the
/// unclaimed ground truth box it overlaps most, provided that overlap is at least
/// `iou_threshold`. Equal confidences keep their input order, and equal overlaps go to the
/// ground truth box that comes first. A second detection of an already claimed tree is a
/// false positive.
///
/// Categories are not compared: a box labelled "Dead" can be found by a detection labelled
/// "Alive".
pub fn match_detections<'a, T: BoundingBoxGeometry>(
    ground_truth: &'a [T],
    detections: &'a [Detection<T>],
    iou_threshold: f64,
) -> MatchResult<'a, T> {
    let mut order: Vec<usize> = (0..detections.len()).collect();
    // sort_by is stable, which keeps ties in input order.
    order.sort_by(|&a, &b| detections[b].confidence.total_cmp(&detections[a].confidence));

    let mut claimed: Vec<bool> = vec![false; ground_truth.len()];
    let mut matches: Vec<Match<'a, T>> = Vec::new();

    for detection in order.into_iter().map(|index| &detections[index]) {
        let mut best: Option<(usize, f64)> = None;
        for (gt_index, gt) in ground_truth.iter().enumerate() {
            if claimed[gt_index] {
                continue;
            }
            let iou = intersection_over_union(&detection.annotation, gt);
            if best.is_none_or(|(_, best_iou)| iou > best_iou) {
                best = Some((gt_index, iou));
            }
        }
        let Some((gt_index, iou)) = best else {
            continue;
        };
        if iou >= iou_threshold {
            claimed[gt_index] = true;
            matches.push(Match { ground_truth: &ground_truth[gt_index], detection, iou });
        }
    }

    let true_positives = matches.len();
    MatchResult {
        true_positives,
        false_positives: detections.len() - true_positives,
        false_negatives: ground_truth.len() - true_positives,
        matches,
    }
}
