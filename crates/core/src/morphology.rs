//! Nearest-neighbour resizing and binary erosion
//!
//! Resizing follows OpenCV's `INTER_NEAREST` index mapping,
//! `src = floor(dst * src_len / dst_len)` clamped to the last source pixel,
//! so a down/up round trip lands on the same pixels the reference pipeline
//! samples.

#![allow(clippy::cast_possible_truncation)]

use docbin_common::image_io::{gray_to_mask, mask_to_gray};
use docbin_common::{BinarizeError, Result};
use imageproc::distance_transform::Norm;
use ndarray::{Array2, Array3};

/// Source index for each destination index along one axis
fn nearest_indices(src_len: usize, dst_len: usize) -> Vec<usize> {
    (0..dst_len)
        .map(|d| ((d * src_len) / dst_len).min(src_len.saturating_sub(1)))
        .collect()
}

/// Nearest-neighbour resize of an HWC raster
pub fn resize_nearest(image: &Array3<u8>, out_h: usize, out_w: usize) -> Result<Array3<u8>> {
    let (height, width, channels) = image.dim();
    if height == 0 || width == 0 || out_h == 0 || out_w == 0 {
        return Err(BinarizeError::shape(format!(
            "cannot resize {height}x{width} to {out_h}x{out_w}"
        )));
    }
    let rows = nearest_indices(height, out_h);
    let cols = nearest_indices(width, out_w);
    Ok(Array3::from_shape_fn((out_h, out_w, channels), |(r, c, ch)| {
        image[[rows[r], cols[c], ch]]
    }))
}

/// Nearest-neighbour resize of a single-channel mask
pub fn resize_mask_nearest(mask: &Array2<u8>, out_h: usize, out_w: usize) -> Result<Array2<u8>> {
    let (height, width) = mask.dim();
    if height == 0 || width == 0 || out_h == 0 || out_w == 0 {
        return Err(BinarizeError::shape(format!(
            "cannot resize {height}x{width} mask to {out_h}x{out_w}"
        )));
    }
    let rows = nearest_indices(height, out_h);
    let cols = nearest_indices(width, out_w);
    Ok(Array2::from_shape_fn((out_h, out_w), |(r, c)| mask[[rows[r], cols[c]]]))
}

/// One erosion pass of a `{0, 255}` mask with a `kernel × kernel` square
///
/// A pixel stays 255 only if its whole in-image neighbourhood is nonzero;
/// pixels outside the image never lower it. `kernel` must be odd.
pub fn erode_square(mask: &Array2<u8>, kernel: usize) -> Result<Array2<u8>> {
    if kernel % 2 == 0 {
        return Err(BinarizeError::config(format!(
            "erosion kernel must be odd, got {kernel}"
        )));
    }
    let radius = u8::try_from(kernel / 2).map_err(|_| {
        BinarizeError::config(format!("erosion kernel {kernel} is too large"))
    })?;
    if radius == 0 {
        return Ok(mask.clone());
    }

    let gray = mask_to_gray(mask)?;
    let eroded = imageproc::morphology::erode(&gray, Norm::LInf, radius);
    gray_to_mask(&eroded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_indices_downsample() {
        assert_eq!(nearest_indices(6, 3), vec![0, 2, 4]);
        assert_eq!(nearest_indices(5, 2), vec![0, 2]);
    }

    #[test]
    fn test_nearest_indices_upsample() {
        assert_eq!(nearest_indices(2, 5), vec![0, 0, 0, 1, 1]);
    }

    #[test]
    fn test_resize_keeps_channels() {
        let mut image = Array3::<u8>::zeros((4, 4, 3));
        image[[2, 2, 1]] = 7;
        let small = resize_nearest(&image, 2, 2).unwrap();
        assert_eq!(small.dim(), (2, 2, 3));
        assert_eq!(small[[1, 1, 1]], 7);
        assert_eq!(small[[1, 1, 0]], 0);
    }

    #[test]
    fn test_resize_mask_round_trip_size() {
        let mask = Array2::from_shape_fn((600, 430), |(r, c)| ((r + c) % 2 * 255) as u8);
        let down = resize_mask_nearest(&mask, 512, 512).unwrap();
        let up = resize_mask_nearest(&down, 600, 430).unwrap();
        assert_eq!(up.dim(), (600, 430));
    }

    #[test]
    fn test_resize_rejects_empty() {
        assert!(resize_nearest(&Array3::zeros((0, 3, 3)), 2, 2).is_err());
        assert!(resize_mask_nearest(&Array2::zeros((3, 3)), 0, 2).is_err());
    }

    #[test]
    fn test_erode_grows_ink() {
        let mut mask = Array2::from_elem((15, 15), 255u8);
        mask[[7, 7]] = 0;
        let eroded = erode_square(&mask, 7).unwrap();

        // 7x7 block around the ink pixel becomes ink, nothing else
        assert_eq!(eroded[[4, 4]], 0);
        assert_eq!(eroded[[10, 10]], 0);
        assert_eq!(eroded[[3, 7]], 255);
        assert_eq!(eroded[[7, 11]], 255);
        assert_eq!(eroded.iter().filter(|&&v| v == 0).count(), 49);
    }

    #[test]
    fn test_erode_ignores_border() {
        let mask = Array2::from_elem((5, 5), 255u8);
        assert_eq!(erode_square(&mask, 7).unwrap(), mask);
    }

    #[test]
    fn test_erode_rejects_even_kernel() {
        assert!(erode_square(&Array2::zeros((3, 3)), 4)
            .unwrap_err()
            .is_config_error());
    }
}
