//! Tiled inference: extract, predict, stitch
//!
//! Shared by stage 1 (four channel models over the original page) and the
//! stage-2 local branch (one colour model over the fused page).

use crate::config::EvalConfig;
use crate::model::SegmentationModel;
use crate::patch::extract_patches;
use crate::predictor::ChannelPredictor;
use crate::preprocess::{ChannelInput, EncoderPreprocessing};
use crate::stitch::stitch_min;
use docbin_common::Result;
use ndarray::{Array2, Array3};
use tracing::debug;

/// Patch geometry and batching for one tiled pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiledInference {
    pub patch_h: usize,
    pub patch_w: usize,
    pub overlap: f64,
    /// Fill value for patch pixels beyond an undersized image
    pub pad_value: u8,
    pub batch_size: usize,
}

impl Default for TiledInference {
    fn default() -> Self {
        Self {
            patch_h: 256,
            patch_w: 256,
            overlap: 0.5,
            pad_value: 255,
            batch_size: crate::predictor::DEFAULT_BATCH_SIZE,
        }
    }
}

impl TiledInference {
    #[must_use]
    pub fn from_config(config: &EvalConfig) -> Self {
        Self {
            patch_h: config.patch_size,
            patch_w: config.patch_size,
            overlap: config.overlap,
            pad_value: config.pad_value,
            batch_size: config.batch_size,
        }
    }

    /// Full-resolution `[0, 255]` map from a single model
    pub fn run(
        &self,
        image: &Array3<u8>,
        model: &dyn SegmentationModel,
        input: ChannelInput,
        preprocessing: &EncoderPreprocessing,
    ) -> Result<Array2<f32>> {
        let mut maps = self.run_many(image, &[(model, input)], preprocessing)?;
        Ok(maps.remove(0))
    }

    /// Full-resolution maps from several models over one shared patch set
    ///
    /// The patches are cut once; each `(model, input)` pair yields one map, in
    /// the order given.
    pub fn run_many(
        &self,
        image: &Array3<u8>,
        models: &[(&dyn SegmentationModel, ChannelInput)],
        preprocessing: &EncoderPreprocessing,
    ) -> Result<Vec<Array2<f32>>> {
        let (height, width, _) = image.dim();
        let set = extract_patches(image, self.patch_h, self.patch_w, self.overlap, self.pad_value)?;
        debug!(
            "Tiled {}x{} image into {} patches of {}x{}",
            height,
            width,
            set.patches.len(),
            self.patch_h,
            self.patch_w
        );

        models
            .iter()
            .map(|&(model, input)| {
                let predictor = ChannelPredictor::new(model, input, preprocessing, self.batch_size)?;
                let predictions = predictor.predict(&set.patches)?;
                stitch_min(&predictions, &set.placements, height, width)
            })
            .collect()
    }
}
