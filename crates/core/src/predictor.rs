//! Batched per-channel inference over patches
//!
//! A [`ChannelPredictor`] pairs one frozen model with the view of the patch it
//! was trained on ([`ChannelInput`]). Patches are prepared, stacked into
//! `N×3×P×P` batches of at most `batch_size`, and the resulting probability
//! maps are rescaled to `[0, 255]` and returned in input order.

use crate::model::SegmentationModel;
use crate::preprocess::{ChannelInput, EncoderPreprocessing};
use docbin_common::{BinarizeError, Result};
use ndarray::{Array2, Array3, Array4, ArrayView3, Axis};
use tracing::debug;

/// Default number of patches per inference call
pub const DEFAULT_BATCH_SIZE: usize = 16;

/// Runs one model over a list of same-size patches
#[derive(Clone, Copy)]
pub struct ChannelPredictor<'a> {
    model: &'a dyn SegmentationModel,
    input: ChannelInput,
    preprocessing: &'a EncoderPreprocessing,
    batch_size: usize,
}

impl std::fmt::Debug for ChannelPredictor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelPredictor")
            .field("model", &self.model.name())
            .field("input", &self.input)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl<'a> ChannelPredictor<'a> {
    pub fn new(
        model: &'a dyn SegmentationModel,
        input: ChannelInput,
        preprocessing: &'a EncoderPreprocessing,
        batch_size: usize,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(BinarizeError::config("batch size must be at least 1"));
        }
        Ok(Self {
            model,
            input,
            preprocessing,
            batch_size,
        })
    }

    #[inline]
    #[must_use]
    pub const fn input(&self) -> ChannelInput {
        self.input
    }

    /// Predict a `[0, 255]` map for every patch, in order
    pub fn predict(&self, patches: &[Array3<u8>]) -> Result<Vec<Array2<f32>>> {
        let mut maps = Vec::with_capacity(patches.len());
        let num_batches = patches.len().div_ceil(self.batch_size);

        for (batch_idx, chunk) in patches.chunks(self.batch_size).enumerate() {
            let batch = self.build_batch(chunk)?;
            debug!(
                "{} ({}): batch {}/{} with {} patches",
                self.model.name(),
                self.input.name(),
                batch_idx + 1,
                num_batches,
                chunk.len()
            );

            let probs = self.model.predict(batch.view())?;
            if probs.len_of(Axis(0)) != chunk.len() {
                return Err(BinarizeError::shape(format!(
                    "{} returned {} maps for {} patches",
                    self.model.name(),
                    probs.len_of(Axis(0)),
                    chunk.len()
                )));
            }
            maps.extend(
                probs
                    .axis_iter(Axis(0))
                    .map(|map| map.mapv(|p| p * 255.0)),
            );
        }
        Ok(maps)
    }

    fn build_batch(&self, chunk: &[Array3<u8>]) -> Result<Array4<f32>> {
        let tensors = chunk
            .iter()
            .map(|patch| self.input.prepare(patch, self.preprocessing))
            .collect::<Result<Vec<_>>>()?;
        let views: Vec<ArrayView3<'_, f32>> = tensors.iter().map(Array3::view).collect();
        ndarray::stack(Axis(0), &views)
            .map_err(|e| BinarizeError::shape(format!("cannot batch patches: {e}")))
    }
}
