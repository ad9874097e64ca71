//! F-measure and pseudo-F-measure on ink pixels

use crate::is_ink;
use crate::skeleton::zhang_suen_thin;
use ndarray::{Array2, Zip};

/// Ink pixel counts of a prediction against a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Counts {
    true_pos: usize,
    false_pos: usize,
    false_neg: usize,
}

fn count(prediction: &Array2<u8>, ground_truth: &Array2<u8>) -> Counts {
    let mut counts = Counts::default();
    Zip::from(prediction).and(ground_truth).for_each(|&p, &g| {
        match (is_ink(p), is_ink(g)) {
            (true, true) => counts.true_pos += 1,
            (true, false) => counts.false_pos += 1,
            (false, true) => counts.false_neg += 1,
            (false, false) => {}
        }
    });
    counts
}

#[allow(clippy::cast_precision_loss)]
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn harmonic(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        100.0 * 2.0 * precision * recall / (precision + recall)
    }
}

/// `100 · 2PR / (P + R)` over ink pixels
///
/// # Panics
///
/// Panics if the two masks differ in size. [`crate::DibcoScorer`] checks the
/// sizes and returns a shape error instead.
#[must_use]
pub fn fmeasure(prediction: &Array2<u8>, ground_truth: &Array2<u8>) -> f64 {
    let c = count(prediction, ground_truth);
    let precision = ratio(c.true_pos, c.true_pos + c.false_pos);
    let recall = ratio(c.true_pos, c.true_pos + c.false_neg);
    harmonic(precision, recall)
}

/// F-measure whose recall is taken against the skeleton of the ground-truth ink
///
/// # Panics
///
/// Panics if the two masks differ in size. [`crate::DibcoScorer`] checks the
/// sizes and returns a shape error instead.
#[must_use]
pub fn pseudo_fmeasure(prediction: &Array2<u8>, ground_truth: &Array2<u8>) -> f64 {
    let c = count(prediction, ground_truth);
    let precision = ratio(c.true_pos, c.true_pos + c.false_pos);

    let ink = ground_truth.mapv(|v| u8::from(is_ink(v)));
    let skeleton = zhang_suen_thin(&ink);
    let mut skeleton_px = 0;
    let mut hit = 0;
    Zip::from(&skeleton).and(prediction).for_each(|&s, &p| {
        if s != 0 {
            skeleton_px += 1;
            if is_ink(p) {
                hit += 1;
            }
        }
    });
    harmonic(precision, ratio(hit, skeleton_px))
}
