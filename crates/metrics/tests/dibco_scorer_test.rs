//! End-to-end checks of the DIBCO scorer on synthetic pages

use docbin_metrics::{BinarizationScorer, DibcoScorer, MetricScores};
use ndarray::{s, Array2};

/// White page with three horizontal text lines
fn synthetic_page() -> Array2<u8> {
    let mut page = Array2::from_elem((64, 96), 1u8);
    for top in [10, 28, 46] {
        page.slice_mut(s![top..top + 4, 8..88]).fill(0);
    }
    page
}

#[test]
fn test_scores_degrade_with_noise() {
    let gt = synthetic_page();
    let perfect = DibcoScorer.score(&gt, &gt).unwrap();

    let mut noisy = gt.clone();
    for (i, v) in noisy.iter_mut().enumerate() {
        if i % 37 == 0 {
            *v = 1 - *v;
        }
    }
    let degraded = DibcoScorer.score(&noisy, &gt).unwrap();

    assert!(degraded.fmeasure < perfect.fmeasure);
    assert!(degraded.pseudo_fmeasure <= perfect.pseudo_fmeasure);
    assert!(degraded.psnr < perfect.psnr);
    assert!(degraded.drd > perfect.drd);
}

#[test]
fn test_blank_prediction_scores_zero_fmeasure() {
    let gt = synthetic_page();
    let blank = Array2::from_elem(gt.dim(), 1u8);
    let scores = DibcoScorer.score(&blank, &gt).unwrap();
    assert_eq!(scores.fmeasure, 0.0);
    assert_eq!(scores.pseudo_fmeasure, 0.0);
    assert!(scores.psnr.is_finite());
}

#[test]
fn test_average_of_runs() {
    let gt = synthetic_page();
    let a = DibcoScorer.score(&gt, &gt).unwrap();
    let b = DibcoScorer.score(&Array2::from_elem(gt.dim(), 1u8), &gt).unwrap();
    let mean = MetricScores::mean(&[a, b]).unwrap();
    assert!((mean.fmeasure - 50.0).abs() < 1e-9);
}
