//! Dataset listing and fold selection
//!
//! A dataset root holds `image/` and `mask/` with matching file names. The
//! image list is sorted by file name and fold `k` of `n` takes every `n`-th
//! entry starting at `k`, so the folds partition the dataset.

use docbin_common::{is_image_file, BinarizeError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Subdirectory of page images
pub const IMAGE_DIR: &str = "image";
/// Subdirectory of ground-truth masks
pub const MASK_DIR: &str = "mask";

/// One page image and its ground truth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// File name up to the first `.`, used for the output mask
    pub name: String,
    pub image_path: PathBuf,
    pub mask_path: PathBuf,
}

impl Sample {
    fn from_image_path(image_path: PathBuf, mask_dir: &Path) -> Result<Self> {
        let Some(file_name) = image_path.file_name().and_then(|n| n.to_str()) else {
            return Err(BinarizeError::config(format!(
                "image file name is not valid UTF-8: {}",
                image_path.display()
            )));
        };
        let file_name = file_name.to_string();
        let name = file_name
            .split('.')
            .next()
            .unwrap_or(file_name.as_str())
            .to_string();
        let mask_path = mask_dir.join(&file_name);
        Ok(Self {
            name,
            image_path,
            mask_path,
        })
    }
}

/// All samples under `root`, sorted by file name
///
/// Entries without an image extension are skipped. An image whose file name is
/// not UTF-8 cannot be named in the output and is a configuration error.
pub fn list_samples(root: &Path) -> Result<Vec<Sample>> {
    let image_dir = root.join(IMAGE_DIR);
    let mask_dir = root.join(MASK_DIR);
    if !image_dir.is_dir() {
        return Err(BinarizeError::config(format!(
            "image directory not found: {}",
            image_dir.display()
        )));
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(&image_dir)? {
        let path = entry?.path();
        if path.is_file() && is_image_file(&path) {
            paths.push(path);
        } else {
            debug!("Skipping non-image entry {}", path.display());
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    paths
        .into_iter()
        .map(|path| Sample::from_image_path(path, &mask_dir))
        .collect()
}

/// Every `fold_total`-th item starting at `fold_num`
pub fn select_fold<T: Clone>(items: &[T], fold_num: usize, fold_total: usize) -> Result<Vec<T>> {
    if fold_total == 0 || fold_num >= fold_total {
        return Err(BinarizeError::config(format!(
            "invalid fold {fold_num} of {fold_total}"
        )));
    }
    Ok(items.iter().skip(fold_num).step_by(fold_total).cloned().collect())
}

/// Samples of one fold; an empty fold is a configuration error
pub fn load_fold(root: &Path, fold_num: usize, fold_total: usize) -> Result<Vec<Sample>> {
    let all = list_samples(root)?;
    let fold = select_fold(&all, fold_num, fold_total)?;
    if fold.is_empty() {
        return Err(BinarizeError::config(format!(
            "fold {} of {} is empty ({} images under {})",
            fold_num,
            fold_total,
            all.len(),
            root.display()
        )));
    }
    info!(
        "Fold {}/{}: {} of {} images",
        fold_num,
        fold_total,
        fold.len(),
        all.len()
    );
    Ok(fold)
}
