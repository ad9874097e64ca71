//! Loaded models for one evaluation run
//!
//! Built once before the first image and then only borrowed; nothing in the
//! pipeline mutates it.

use crate::config::EvalConfig;
use crate::model::{OnnxSegmentationModel, SegmentationModel};
use crate::preprocess::{ChannelInput, EncoderPreprocessing};
use crate::weights::{WeightSet, STAGE1_MODEL_COUNT};
use docbin_common::Result;
use std::time::Instant;
use tracing::info;

/// The six frozen models and the shared encoder normalization
pub struct InferenceContext {
    stage1: [Box<dyn SegmentationModel>; STAGE1_MODEL_COUNT],
    local: Box<dyn SegmentationModel>,
    global: Box<dyn SegmentationModel>,
    preprocessing: EncoderPreprocessing,
}

impl std::fmt::Debug for InferenceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage1: Vec<&str> = self.stage1.iter().map(|m| m.name()).collect();
        f.debug_struct("InferenceContext")
            .field("stage1", &stage1)
            .field("local", &self.local.name())
            .field("global", &self.global.name())
            .field("preprocessing", &self.preprocessing)
            .finish()
    }
}

impl InferenceContext {
    /// Assemble a context from already-constructed models
    ///
    /// `stage1` is ordered blue, green, red, gray.
    #[must_use]
    pub fn new(
        stage1: [Box<dyn SegmentationModel>; STAGE1_MODEL_COUNT],
        local: Box<dyn SegmentationModel>,
        global: Box<dyn SegmentationModel>,
        preprocessing: EncoderPreprocessing,
    ) -> Self {
        Self {
            stage1,
            local,
            global,
            preprocessing,
        }
    }

    /// Discover and load every ONNX model the configured fold needs
    pub fn load(config: &EvalConfig) -> Result<Self> {
        let preprocessing = EncoderPreprocessing::from_config(config)?;
        let weights = WeightSet::resolve(config)?;
        Self::from_weights(&weights, config, preprocessing)
    }

    /// Load ONNX models from resolved weight paths
    pub fn from_weights(
        weights: &WeightSet,
        config: &EvalConfig,
        preprocessing: EncoderPreprocessing,
    ) -> Result<Self> {
        let start = Instant::now();
        let load = |name: String, path: &std::path::Path| -> Result<Box<dyn SegmentationModel>> {
            let model = OnnxSegmentationModel::load(name, path, config.device, config.apply_sigmoid)?;
            Ok(Box::new(model))
        };

        let [blue, green, red, gray] = &weights.stage1;
        let stage1 = [
            load(stage1_name(ChannelInput::Blue), blue.as_path())?,
            load(stage1_name(ChannelInput::Green), green.as_path())?,
            load(stage1_name(ChannelInput::Red), red.as_path())?,
            load(stage1_name(ChannelInput::Gray), gray.as_path())?,
        ];
        let local = load("stage2-local".to_string(), weights.local.as_path())?;
        let global = load("stage2-global".to_string(), weights.global.as_path())?;

        info!("Loaded 6 models in {:.2?}", start.elapsed());
        Ok(Self::new(stage1, local, global, preprocessing))
    }

    /// Stage-1 models paired with the channel each one reads
    #[must_use]
    pub fn stage1_models(&self) -> [(&dyn SegmentationModel, ChannelInput); STAGE1_MODEL_COUNT] {
        let [blue, green, red, gray] = &self.stage1;
        [
            (blue.as_ref(), ChannelInput::Blue),
            (green.as_ref(), ChannelInput::Green),
            (red.as_ref(), ChannelInput::Red),
            (gray.as_ref(), ChannelInput::Gray),
        ]
    }

    #[must_use]
    pub fn local_model(&self) -> &dyn SegmentationModel {
        self.local.as_ref()
    }

    #[must_use]
    pub fn global_model(&self) -> &dyn SegmentationModel {
        self.global.as_ref()
    }

    #[must_use]
    pub const fn preprocessing(&self) -> &EncoderPreprocessing {
        &self.preprocessing
    }
}

fn stage1_name(input: ChannelInput) -> String {
    format!("stage1-{}", input.name())
}
