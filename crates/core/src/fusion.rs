//! Map and mask fusion rules
//!
//! - [`color_fusion`] averages each colour map with the gray map into a
//!   synthetic BGR page for stage 2.
//! - [`binarize`] thresholds a `[0, 255]` map to `{0, 255}`.
//! - [`or_fuse`] merges the local and global masks.
//! - [`to_score_mask`] maps a `{0, 255}` mask to the `{0, 1}` scoring domain.

use docbin_common::{BinarizeError, Result};
use ndarray::{Array2, Array3, Axis, Zip};

/// Default binarization cut on the `[0, 255]` scale
pub const DEFAULT_CUT: u8 = 128;

/// Stage-1 colour fusion
///
/// Channel `c` of the output is `(map_c + gray) / 2`, truncated to `u8`, with
/// blue, green and red landing in BGR positions 0, 1 and 2.
pub fn color_fusion(
    blue: &Array2<f32>,
    green: &Array2<f32>,
    red: &Array2<f32>,
    gray: &Array2<f32>,
) -> Result<Array3<u8>> {
    let dim = gray.dim();
    for (name, map) in [("blue", blue), ("green", green), ("red", red)] {
        if map.dim() != dim {
            return Err(BinarizeError::shape(format!(
                "{name} map is {:?} but gray map is {dim:?}",
                map.dim()
            )));
        }
    }

    let mut fused = Array3::<u8>::zeros((dim.0, dim.1, 3));
    for (c, colour) in [blue, green, red].into_iter().enumerate() {
        Zip::from(fused.index_axis_mut(Axis(2), c))
            .and(colour)
            .and(gray)
            .for_each(|out, &v, &g| *out = truncate_u8((v + g) / 2.0));
    }
    Ok(fused)
}

/// `value > cut → 255`, else `0`, after truncating the map to `u8`
#[must_use]
pub fn binarize(map: &Array2<f32>, cut: u8) -> Array2<u8> {
    map.mapv(|v| if truncate_u8(v) > cut { 255 } else { 0 })
}

/// Threshold an already-integral mask with the same rule as [`binarize`]
#[must_use]
pub fn binarize_u8(mask: &Array2<u8>, cut: u8) -> Array2<u8> {
    mask.mapv(|v| if v > cut { 255 } else { 0 })
}

/// Pointwise bitwise OR of two masks of equal size
pub fn or_fuse(local: &Array2<u8>, global: &Array2<u8>) -> Result<Array2<u8>> {
    if local.dim() != global.dim() {
        return Err(BinarizeError::shape(format!(
            "local mask is {:?} but global mask is {:?}",
            local.dim(),
            global.dim()
        )));
    }
    Ok(Zip::from(local).and(global).map_collect(|&a, &b| a | b))
}

/// Map a mask to `{0, 1}` with `> 0 → 1`
#[must_use]
pub fn to_score_mask(mask: &Array2<u8>) -> Array2<u8> {
    mask.mapv(|v| u8::from(v > 0))
}

/// Cast with truncation toward zero, saturating at the `u8` bounds
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn truncate_u8(v: f32) -> u8 {
    v as u8
}
