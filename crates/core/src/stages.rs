//! The two pipeline stages
//!
//! ```text
//! page ─► Stage1Fusion ─► fused BGR ─► LocalBinarizer ──┐
//!   │                                                   ├─► OR ─► mask
//!   └──────────────────────────────► GlobalBinarizer ───┘
//! ```

use crate::config::EvalConfig;
use crate::context::InferenceContext;
use crate::fusion::{binarize, color_fusion, DEFAULT_CUT};
use crate::morphology::{erode_square, resize_mask_nearest, resize_nearest};
use crate::predictor::ChannelPredictor;
use crate::preprocess::ChannelInput;
use crate::tiled::TiledInference;
use docbin_common::{BinarizeError, Result};
use ndarray::{Array2, Array3};
use tracing::debug;

/// Stage 1: four channel models over the page, averaged into a BGR image
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Stage1Fusion {
    pub tiled: TiledInference,
}

impl Stage1Fusion {
    pub fn run(&self, ctx: &InferenceContext, image: &Array3<u8>) -> Result<Array3<u8>> {
        let maps = self
            .tiled
            .run_many(image, &ctx.stage1_models(), ctx.preprocessing())?;
        let [blue, green, red, gray] = maps.as_slice() else {
            return Err(BinarizeError::shape(format!(
                "expected 4 stage-1 maps, got {}",
                maps.len()
            )));
        };
        color_fusion(blue, green, red, gray)
    }
}

/// Stage 2, local branch: the fused page re-tiled through the colour model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalBinarizer {
    pub tiled: TiledInference,
    pub cut: u8,
}

impl Default for LocalBinarizer {
    fn default() -> Self {
        Self {
            tiled: TiledInference::default(),
            cut: DEFAULT_CUT,
        }
    }
}

impl LocalBinarizer {
    pub fn run(&self, ctx: &InferenceContext, fused: &Array3<u8>) -> Result<Array2<u8>> {
        let map = self
            .tiled
            .run(fused, ctx.local_model(), ChannelInput::Bgr, ctx.preprocessing())?;
        Ok(binarize(&map, self.cut))
    }
}

/// Stage 2, global branch: the whole page at a fixed low resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalBinarizer {
    /// Square side the page is resized to
    pub size: usize,
    pub cut: u8,
    pub erode_kernel: usize,
}

impl Default for GlobalBinarizer {
    fn default() -> Self {
        Self {
            size: 512,
            cut: DEFAULT_CUT,
            erode_kernel: 7,
        }
    }
}

impl GlobalBinarizer {
    pub fn run(&self, ctx: &InferenceContext, image: &Array3<u8>) -> Result<Array2<u8>> {
        let (height, width, _) = image.dim();
        let resized = resize_nearest(image, self.size, self.size)?;

        // One image, one batch
        let predictor = ChannelPredictor::new(ctx.global_model(), ChannelInput::Bgr, ctx.preprocessing(), 1)?;
        let mut maps = predictor.predict(std::slice::from_ref(&resized))?;
        let map = maps
            .pop()
            .ok_or_else(|| BinarizeError::shape("global model returned no map"))?;
        debug!("Global branch: {}x{} -> {}x{}", height, width, self.size, self.size);

        let small = binarize(&map, self.cut);
        let mask = resize_mask_nearest(&small, height, width)?;
        erode_square(&mask, self.erode_kernel)
    }
}

/// Both stages with their configured parameters
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TwoStagePipeline {
    pub stage1: Stage1Fusion,
    pub local: LocalBinarizer,
    pub global: GlobalBinarizer,
}

impl TwoStagePipeline {
    #[must_use]
    pub fn from_config(config: &EvalConfig) -> Self {
        let tiled = TiledInference::from_config(config);
        Self {
            stage1: Stage1Fusion { tiled },
            local: LocalBinarizer {
                tiled,
                cut: config.binarize_cut,
            },
            global: GlobalBinarizer {
                size: config.global_size,
                cut: config.binarize_cut,
                erode_kernel: config.erode_kernel,
            },
        }
    }
}
