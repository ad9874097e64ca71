//! # docbin-metrics
//!
//! Binarization quality metrics in the DIBCO convention.
//!
//! Both masks are `{0, 1}` rasters of equal size where **0 is ink** and 1 is
//! background. Any nonzero value is treated as background.
//!
//! | metric | better | range |
//! |---|---|---|
//! | F-measure | higher | 0–100 |
//! | pseudo-F-measure | higher | 0–100 |
//! | PSNR | higher | dB, `+inf` for a perfect match |
//! | DRD | lower | ≥ 0 |

pub mod drd;
pub mod fmeasure;
pub mod psnr;
pub mod skeleton;

use docbin_common::{BinarizeError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

pub use drd::drd;
pub use fmeasure::{fmeasure, pseudo_fmeasure};
pub use psnr::psnr;
pub use skeleton::zhang_suen_thin;

/// The four scores of one prediction
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricScores {
    pub fmeasure: f64,
    pub pseudo_fmeasure: f64,
    pub psnr: f64,
    pub drd: f64,
}

impl MetricScores {
    /// Arithmetic mean of each metric; `None` for an empty slice
    #[must_use]
    pub fn mean(scores: &[MetricScores]) -> Option<MetricScores> {
        if scores.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = scores.len() as f64;
        let sum = scores.iter().fold(MetricScores::default(), |acc, s| MetricScores {
            fmeasure: acc.fmeasure + s.fmeasure,
            pseudo_fmeasure: acc.pseudo_fmeasure + s.pseudo_fmeasure,
            psnr: acc.psnr + s.psnr,
            drd: acc.drd + s.drd,
        });
        Some(MetricScores {
            fmeasure: sum.fmeasure / n,
            pseudo_fmeasure: sum.pseudo_fmeasure / n,
            psnr: sum.psnr / n,
            drd: sum.drd / n,
        })
    }
}

/// Scores a predicted mask against ground truth
pub trait BinarizationScorer {
    fn score(&self, prediction: &Array2<u8>, ground_truth: &Array2<u8>) -> Result<MetricScores>;
}

/// Standard DIBCO metric suite
#[derive(Debug, Clone, Copy, Default)]
pub struct DibcoScorer;

impl BinarizationScorer for DibcoScorer {
    fn score(&self, prediction: &Array2<u8>, ground_truth: &Array2<u8>) -> Result<MetricScores> {
        check_same_size(prediction, ground_truth)?;
        let scores = MetricScores {
            fmeasure: fmeasure(prediction, ground_truth),
            pseudo_fmeasure: pseudo_fmeasure(prediction, ground_truth),
            psnr: psnr(prediction, ground_truth),
            drd: drd(prediction, ground_truth),
        };
        tracing::debug!(
            "F={:.4} pF={:.4} PSNR={:.4} DRD={:.4}",
            scores.fmeasure,
            scores.pseudo_fmeasure,
            scores.psnr,
            scores.drd
        );
        Ok(scores)
    }
}

fn check_same_size(prediction: &Array2<u8>, ground_truth: &Array2<u8>) -> Result<()> {
    if prediction.dim() != ground_truth.dim() {
        return Err(BinarizeError::shape(format!(
            "prediction is {:?} but ground truth is {:?}",
            prediction.dim(),
            ground_truth.dim()
        )));
    }
    Ok(())
}

/// Pixel is ink in the `{0, 1}` convention
#[inline]
pub(crate) fn is_ink(v: u8) -> bool {
    v == 0
}
