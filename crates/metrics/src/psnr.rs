//! Peak signal-to-noise ratio for `{0, 1}` masks

use ndarray::{Array2, Zip};

/// `10 · log10(1 / MSE)`, with `+inf` when the masks agree everywhere
///
/// # Panics
///
/// Panics if the two masks differ in size. [`crate::DibcoScorer`] checks the
/// sizes and returns a shape error instead.
#[must_use]
pub fn psnr(prediction: &Array2<u8>, ground_truth: &Array2<u8>) -> f64 {
    if prediction.is_empty() {
        return f64::INFINITY;
    }
    let mut mismatched = 0usize;
    Zip::from(prediction).and(ground_truth).for_each(|&p, &g| {
        if (p != 0) != (g != 0) {
            mismatched += 1;
        }
    });
    if mismatched == 0 {
        return f64::INFINITY;
    }
    #[allow(clippy::cast_precision_loss)]
    let mse = mismatched as f64 / prediction.len() as f64;
    10.0 * (1.0 / mse).log10()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_identical_is_infinite() {
        let gt = array![[0u8, 1], [1, 0]];
        assert!(psnr(&gt, &gt).is_infinite());
    }

    #[test]
    fn test_one_in_ten_wrong_is_ten_db() {
        let gt = Array2::from_elem((1, 10), 1u8);
        let mut pred = gt.clone();
        pred[[0, 3]] = 0;
        assert!((psnr(&pred, &gt) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_wrong_is_zero_db() {
        let gt = array![[0u8, 0]];
        let pred = array![[1u8, 1]];
        assert!(psnr(&pred, &gt).abs() < 1e-12);
    }
}
