//! Raster I/O for page images and masks
//!
//! Page images are kept as `Array3<u8>` in HWC layout with **BGR** channel
//! order. The decoded RGB buffer is reordered exactly once, here, so every
//! downstream component can index channels as blue=0, green=1, red=2.
//!
//! Masks are single-channel `Array2<u8>`.

use crate::error::{BinarizeError, Result};
use image::{GrayImage, RgbImage};
use ndarray::{Array2, Array3};
use std::path::Path;
use tracing::debug;

/// File extensions accepted as page images (compared case-insensitively)
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "bmp", "tif", "tiff", "ppm", "pgm", "webp",
];

/// Check whether a path looks like a decodable raster by its extension
#[must_use]
pub fn is_image_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Convert a decoded RGB image to an HWC BGR array
#[must_use]
pub fn rgb_to_bgr(image: &RgbImage) -> Array3<u8> {
    let (width, height) = image.dimensions();
    let mut bgr = Array3::<u8>::zeros((height as usize, width as usize, 3));
    for (x, y, pixel) in image.enumerate_pixels() {
        let (row, col) = (y as usize, x as usize);
        bgr[[row, col, 0]] = pixel[2];
        bgr[[row, col, 1]] = pixel[1];
        bgr[[row, col, 2]] = pixel[0];
    }
    bgr
}

/// Load a page image as an HWC BGR array
///
/// Any decode failure is returned as an error; callers treat it as fatal.
pub fn load_bgr<P: AsRef<Path>>(path: P) -> Result<Array3<u8>> {
    let path = path.as_ref();
    let rgb = image::open(path)
        .map_err(|e| BinarizeError::Image(format!("{}: {e}", path.display())))?
        .to_rgb8();
    debug!(
        "Loaded {} ({}x{})",
        path.display(),
        rgb.width(),
        rgb.height()
    );
    Ok(rgb_to_bgr(&rgb))
}

/// Load a single-channel mask
pub fn load_mask<P: AsRef<Path>>(path: P) -> Result<Array2<u8>> {
    let path = path.as_ref();
    let gray = image::open(path)
        .map_err(|e| BinarizeError::Image(format!("{}: {e}", path.display())))?
        .to_luma8();
    let (width, height) = gray.dimensions();
    Array2::from_shape_vec((height as usize, width as usize), gray.into_raw())
        .map_err(|e| BinarizeError::shape(format!("mask {}: {e}", path.display())))
}

/// Convert a mask array to a `GrayImage`
pub fn mask_to_gray(mask: &Array2<u8>) -> Result<GrayImage> {
    let (height, width) = mask.dim();
    GrayImage::from_raw(width as u32, height as u32, mask.iter().copied().collect())
        .ok_or_else(|| BinarizeError::shape(format!("cannot build {width}x{height} gray image")))
}

/// Convert a `GrayImage` back to a mask array
pub fn gray_to_mask(image: &GrayImage) -> Result<Array2<u8>> {
    let (width, height) = image.dimensions();
    Array2::from_shape_vec((height as usize, width as usize), image.as_raw().clone())
        .map_err(|e| BinarizeError::shape(e.to_string()))
}

/// Write a mask as an 8-bit single-channel image; the format follows the extension
pub fn save_mask<P: AsRef<Path>>(path: P, mask: &Array2<u8>) -> Result<()> {
    let path = path.as_ref();
    mask_to_gray(mask)?
        .save(path)
        .map_err(|e| BinarizeError::Image(format!("{}: {e}", path.display())))
}
