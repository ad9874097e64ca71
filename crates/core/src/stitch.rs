//! Patch stitching with minimum fusion
//!
//! The canvas starts at 255 (certain background) everywhere and every patch
//! lowers it wherever it predicts a smaller value. A pixel covered by several
//! patches therefore ends up with the smallest prediction any of them made.
//! `min` is commutative and associative, so the result does not depend on the
//! order patches are applied in.

use crate::patch::Placement;
use docbin_common::{BinarizeError, Result};
use ndarray::{s, Array2, Zip};

/// Initial canvas value before any patch is applied
pub const BACKGROUND: f32 = 255.0;

/// Reassemble a full-size probability map from overlapping patch predictions
///
/// `patches[i]` is placed according to `placements[i]`; only its valid
/// sub-window `[offset, offset + cut)` is used.
pub fn stitch_min(
    patches: &[Array2<f32>],
    placements: &[Placement],
    image_h: usize,
    image_w: usize,
) -> Result<Array2<f32>> {
    if patches.len() != placements.len() {
        return Err(BinarizeError::shape(format!(
            "{} patch predictions but {} placements",
            patches.len(),
            placements.len()
        )));
    }

    let mut canvas = Array2::from_elem((image_h, image_w), BACKGROUND);
    for (index, (patch, placement)) in patches.iter().zip(placements).enumerate() {
        apply_patch(&mut canvas, patch, placement).map_err(|e| {
            BinarizeError::shape(format!("patch {index}: {e}"))
        })?;
    }
    Ok(canvas)
}

/// Fold one patch into the canvas with pointwise minimum
pub fn apply_patch(canvas: &mut Array2<f32>, patch: &Array2<f32>, placement: &Placement) -> Result<()> {
    let (canvas_h, canvas_w) = canvas.dim();
    let (patch_h, patch_w) = patch.dim();
    let Placement {
        dest_row_start,
        dest_col_start,
        dest_row_end,
        dest_col_end,
        src_row_offset,
        src_col_offset,
    } = *placement;

    if dest_row_start > dest_row_end
        || dest_col_start > dest_col_end
        || dest_row_end > canvas_h
        || dest_col_end > canvas_w
    {
        return Err(BinarizeError::shape(format!(
            "destination {dest_row_start}..{dest_row_end} x {dest_col_start}..{dest_col_end} \
             outside {canvas_h}x{canvas_w} canvas"
        )));
    }

    let cut_h = placement.height();
    let cut_w = placement.width();
    if src_row_offset + cut_h > patch_h || src_col_offset + cut_w > patch_w {
        return Err(BinarizeError::shape(format!(
            "source window at ({src_row_offset}, {src_col_offset}) of size {cut_h}x{cut_w} \
             exceeds {patch_h}x{patch_w} patch"
        )));
    }

    let source = patch.slice(s![
        src_row_offset..src_row_offset + cut_h,
        src_col_offset..src_col_offset + cut_w
    ]);
    let dest = canvas.slice_mut(s![dest_row_start..dest_row_end, dest_col_start..dest_col_end]);
    Zip::from(dest).and(&source).for_each(|d, &v| *d = d.min(v));
    Ok(())
}
