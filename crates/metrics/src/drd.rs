//! Distance-reciprocal distortion
//!
//! Reference: H. Lu, A. C. Kot and Y. Q. Shi, "Distance-reciprocal distortion
//! measure for binary document images", IEEE SPL 11(2), 2004.
//!
//! Every flipped pixel costs the weighted disagreement between its predicted
//! value and the ground truth in its 5×5 neighbourhood, using a normalized
//! reciprocal-distance weight matrix. The total is divided by the number of
//! non-uniform 8×8 ground-truth blocks.

use ndarray::Array2;

/// Weight matrix side
const WINDOW: usize = 5;
/// Block side used to count non-uniform blocks
const BLOCK: usize = 8;

/// Normalized 5×5 reciprocal-distance weights with a zero centre
#[must_use]
pub fn weight_matrix() -> [[f64; WINDOW]; WINDOW] {
    let centre = (WINDOW / 2) as f64;
    let mut weights = [[0.0; WINDOW]; WINDOW];
    let mut total = 0.0;
    for (i, row) in weights.iter_mut().enumerate() {
        for (j, w) in row.iter_mut().enumerate() {
            let (di, dj) = (i as f64 - centre, j as f64 - centre);
            if di != 0.0 || dj != 0.0 {
                *w = 1.0 / (di * di + dj * dj).sqrt();
                total += *w;
            }
        }
    }
    for w in weights.iter_mut().flatten() {
        *w /= total;
    }
    weights
}

/// 8×8 ground-truth blocks, including partial edge blocks, that mix both classes
#[must_use]
pub fn non_uniform_blocks(ground_truth: &Array2<u8>) -> usize {
    let (height, width) = ground_truth.dim();
    let mut count = 0;
    for r0 in (0..height).step_by(BLOCK) {
        for c0 in (0..width).step_by(BLOCK) {
            let block = ground_truth.slice(ndarray::s![
                r0..(r0 + BLOCK).min(height),
                c0..(c0 + BLOCK).min(width)
            ]);
            let first = block[[0, 0]] != 0;
            if block.iter().any(|&v| (v != 0) != first) {
                count += 1;
            }
        }
    }
    count
}

/// DRD of `prediction` against `ground_truth`; lower is better
///
/// # Panics
///
/// Panics if the two masks differ in size. [`crate::DibcoScorer`] checks the
/// sizes and returns a shape error instead.
#[must_use]
pub fn drd(prediction: &Array2<u8>, ground_truth: &Array2<u8>) -> f64 {
    let weights = weight_matrix();
    let (height, width) = ground_truth.dim();
    let half = WINDOW / 2;

    let mut total = 0.0;
    for ((row, col), &p) in prediction.indexed_iter() {
        let predicted = p != 0;
        if predicted == (ground_truth[[row, col]] != 0) {
            continue;
        }
        for (i, weight_row) in weights.iter().enumerate() {
            let Some(r) = (row + i).checked_sub(half).filter(|&r| r < height) else {
                continue;
            };
            for (j, &w) in weight_row.iter().enumerate() {
                let Some(c) = (col + j).checked_sub(half).filter(|&c| c < width) else {
                    continue;
                };
                if (ground_truth[[r, c]] != 0) != predicted {
                    total += w;
                }
            }
        }
    }

    let nubn = non_uniform_blocks(ground_truth);
    #[allow(clippy::cast_precision_loss)]
    let divisor = if nubn == 0 { 1.0 } else { nubn as f64 };
    total / divisor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_are_normalized_and_symmetric() {
        let w = weight_matrix();
        let sum: f64 = w.iter().flatten().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert_eq!(w[2][2], 0.0);
        assert!((w[0][0] - w[4][4]).abs() < 1e-15);
        assert!(w[2][1] > w[2][0]);
    }

    #[test]
    fn test_non_uniform_blocks_count_partial_edges() {
        let mut gt = Array2::from_elem((10, 10), 1u8);
        assert_eq!(non_uniform_blocks(&gt), 0);
        gt[[9, 9]] = 0; // partial corner block
        gt[[0, 0]] = 0;
        assert_eq!(non_uniform_blocks(&gt), 2);
    }

    #[test]
    fn test_identical_masks_have_zero_drd() {
        let mut gt = Array2::from_elem((16, 16), 1u8);
        gt[[5, 5]] = 0;
        assert_eq!(drd(&gt, &gt), 0.0);
    }

    #[test]
    fn test_isolated_flip_in_uniform_region_costs_one_weight_sum() {
        // A single false ink pixel surrounded by background disagrees with
        // every neighbour in its window
        let mut gt = Array2::from_elem((16, 16), 1u8);
        gt[[0, 0]] = 0; // one non-uniform block elsewhere
        let mut pred = gt.clone();
        pred[[10, 10]] = 0;
        assert!((drd(&pred, &gt) - 1.0).abs() < 1e-12);
    }

    #[test]
    #[should_panic]
    fn test_drd_requires_equal_sizes() {
        let _ = drd(&Array2::zeros((4, 4)), &Array2::zeros((2, 2)));
    }
}
