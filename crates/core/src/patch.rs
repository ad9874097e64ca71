//! Overlapping patch extraction
//!
//! Tiles start at multiples of the stride `patch × (1 − overlap)`. The last
//! tile of an axis would overshoot the border, so it is sampled back-shifted
//! to `len − patch` while its destination window keeps the nominal start.
//! The difference between the two positions is the placement's source offset.
//!
//! ```text
//! len = 600, patch = 256, stride = 128
//! nominal  0      128    256    384
//! sampled  0      128    256    344   (clamped to 600 − 256)
//! dest     0..256 128..384 256..512 384..600
//! offset   0      0      0      40
//! ```
//!
//! Only an image smaller than the patch needs padding: its single tile is
//! sampled at the origin and the remainder is filled with a constant.

use docbin_common::{BinarizeError, Result};
use ndarray::{s, Array3};

/// Where a patch lands in the full image and which part of it is valid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    pub dest_row_start: usize,
    pub dest_col_start: usize,
    pub dest_row_end: usize,
    pub dest_col_end: usize,
    /// Row inside the patch that maps to `dest_row_start`
    pub src_row_offset: usize,
    /// Column inside the patch that maps to `dest_col_start`
    pub src_col_offset: usize,
}

impl Placement {
    /// Rows of the destination window
    #[inline]
    #[must_use]
    pub const fn height(&self) -> usize {
        self.dest_row_end - self.dest_row_start
    }

    /// Columns of the destination window
    #[inline]
    #[must_use]
    pub const fn width(&self) -> usize {
        self.dest_col_end - self.dest_col_start
    }
}

/// One axis position: nominal grid start and the in-bounds sampling start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AxisTile {
    nominal: usize,
    sampled: usize,
}

/// Tile stride for a patch edge and overlap ratio (never below one pixel)
#[inline]
#[must_use]
pub fn tile_stride(patch: usize, overlap: f64) -> usize {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let stride = (patch as f64 * (1.0 - overlap)).floor() as usize;
    stride.max(1)
}

/// Nominal start offsets along one axis: `⌈(len − patch) / stride⌉ + 1` of
/// them, or a single one when the axis fits in one patch
#[must_use]
pub fn axis_starts(len: usize, patch: usize, stride: usize) -> Vec<usize> {
    axis_tiles(len, patch, stride)
        .into_iter()
        .map(|tile| tile.nominal)
        .collect()
}

fn axis_tiles(len: usize, patch: usize, stride: usize) -> Vec<AxisTile> {
    if len <= patch {
        return vec![AxisTile {
            nominal: 0,
            sampled: 0,
        }];
    }
    let last_sampled = len - patch;
    let count = last_sampled.div_ceil(stride) + 1;
    (0..count)
        .map(|i| {
            let nominal = i * stride;
            AxisTile {
                nominal,
                sampled: nominal.min(last_sampled),
            }
        })
        .collect()
}

/// Patch layout for an image, independent of pixel data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchGrid {
    pub image_h: usize,
    pub image_w: usize,
    pub patch_h: usize,
    pub patch_w: usize,
    /// Row-major placements
    pub placements: Vec<Placement>,
    /// Top-left sampling corner of each patch, parallel to `placements`
    pub origins: Vec<(usize, usize)>,
}

impl PatchGrid {
    /// Lay out overlapping tiles over an `image_h × image_w` raster
    pub fn new(
        image_h: usize,
        image_w: usize,
        patch_h: usize,
        patch_w: usize,
        overlap: f64,
    ) -> Result<Self> {
        if image_h == 0 || image_w == 0 {
            return Err(BinarizeError::shape(format!(
                "cannot tile an empty {image_h}x{image_w} image"
            )));
        }
        if patch_h == 0 || patch_w == 0 {
            return Err(BinarizeError::config(format!(
                "patch size must be positive, got {patch_h}x{patch_w}"
            )));
        }
        if !(0.0..1.0).contains(&overlap) {
            return Err(BinarizeError::config(format!(
                "overlap must lie in [0, 1), got {overlap}"
            )));
        }

        let rows = axis_tiles(image_h, patch_h, tile_stride(patch_h, overlap));
        let cols = axis_tiles(image_w, patch_w, tile_stride(patch_w, overlap));

        let mut placements = Vec::with_capacity(rows.len() * cols.len());
        let mut origins = Vec::with_capacity(rows.len() * cols.len());
        for row in &rows {
            for col in &cols {
                placements.push(Placement {
                    dest_row_start: row.nominal,
                    dest_col_start: col.nominal,
                    dest_row_end: (row.nominal + patch_h).min(image_h),
                    dest_col_end: (col.nominal + patch_w).min(image_w),
                    src_row_offset: row.nominal - row.sampled,
                    src_col_offset: col.nominal - col.sampled,
                });
                origins.push((row.sampled, col.sampled));
            }
        }

        Ok(Self {
            image_h,
            image_w,
            patch_h,
            patch_w,
            placements,
            origins,
        })
    }

    /// Number of patches in the grid
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Cut every patch out of `image` in grid order
    ///
    /// Every returned patch is exactly `patch_h × patch_w × C`; pixels beyond
    /// the border of an undersized image are set to `pad_value`.
    pub fn sample(&self, image: &Array3<u8>, pad_value: u8) -> Result<Vec<Array3<u8>>> {
        let (height, width, channels) = image.dim();
        if (height, width) != (self.image_h, self.image_w) {
            return Err(BinarizeError::shape(format!(
                "grid built for {}x{} but image is {height}x{width}",
                self.image_h, self.image_w
            )));
        }

        let patches = self
            .origins
            .iter()
            .map(|&(row, col)| {
                let row_end = (row + self.patch_h).min(height);
                let col_end = (col + self.patch_w).min(width);
                let window = image.slice(s![row..row_end, col..col_end, ..]);
                if window.dim() == (self.patch_h, self.patch_w, channels) {
                    window.to_owned()
                } else {
                    let mut patch =
                        Array3::from_elem((self.patch_h, self.patch_w, channels), pad_value);
                    patch
                        .slice_mut(s![..row_end - row, ..col_end - col, ..])
                        .assign(&window);
                    patch
                }
            })
            .collect();
        Ok(patches)
    }
}

/// Patches together with their placements, in row-major order
#[derive(Debug, Clone)]
pub struct PatchSet {
    pub patches: Vec<Array3<u8>>,
    pub placements: Vec<Placement>,
}

/// Split `image` into overlapping `patch_h × patch_w` tiles
pub fn extract_patches(
    image: &Array3<u8>,
    patch_h: usize,
    patch_w: usize,
    overlap: f64,
    pad_value: u8,
) -> Result<PatchSet> {
    let (height, width, _) = image.dim();
    let grid = PatchGrid::new(height, width, patch_h, patch_w, overlap)?;
    let patches = grid.sample(image, pad_value)?;
    Ok(PatchSet {
        patches,
        placements: grid.placements,
    })
}
