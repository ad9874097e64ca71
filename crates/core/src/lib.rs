//! # docbin-core
//!
//! Two-stage tiled document binarization and fold evaluation.
//!
//! ## Pipeline
//!
//! 1. **Stage 1**: the page is cut into overlapping 256×256 tiles
//!    ([`patch`]). Four channel models (blue, green, red, gray) predict a
//!    background probability per tile ([`predictor`]). The tiles are stitched
//!    back with minimum fusion ([`stitch`]) and the four maps are averaged into
//!    a synthetic BGR page ([`fusion::color_fusion`]).
//! 2. **Stage 2 local**: the synthetic page is re-tiled through a colour model
//!    and thresholded.
//! 3. **Stage 2 global**: the original page is resized to 512×512, predicted in
//!    one shot, thresholded, resized back and eroded ([`morphology`]).
//! 4. The local and global masks are OR-fused, scored with
//!    [`docbin_metrics`] and written out ([`report`]).
//!
//! ## Example
//!
//! ```no_run
//! use docbin_core::{EvalConfig, Evaluator, InferenceContext};
//!
//! # fn main() -> docbin_common::Result<()> {
//! let config = EvalConfig::builder()
//!     .dataset_root("/data/LRDE")
//!     .fold(0, 5)
//!     .build()?;
//! let context = InferenceContext::load(&config)?;
//! let summary = Evaluator::new(&config, &context).run()?;
//! println!("F-measure: {:.2}", summary.average.fmeasure);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod dataset;
pub mod evaluate;
pub mod fusion;
pub mod model;
pub mod morphology;
pub mod patch;
pub mod predictor;
pub mod preprocess;
pub mod report;
pub mod stages;
pub mod stitch;
pub mod tiled;
pub mod weights;

pub use config::{Device, EvalConfig, EvalConfigBuilder};
pub use context::InferenceContext;
pub use dataset::{list_samples, load_fold, select_fold, Sample};
pub use evaluate::{EvalSummary, Evaluator, ImageResult, ImageState};
pub use fusion::{binarize, color_fusion, or_fuse, to_score_mask};
pub use model::{OnnxSegmentationModel, SegmentationModel};
pub use patch::{extract_patches, PatchGrid, PatchSet, Placement};
pub use predictor::ChannelPredictor;
pub use preprocess::{ChannelInput, EncoderPreprocessing, InputSpace};
pub use report::MetricsReport;
pub use stages::{GlobalBinarizer, LocalBinarizer, Stage1Fusion, TwoStagePipeline};
pub use stitch::stitch_min;
pub use tiled::TiledInference;
pub use weights::{discover_weights, WeightSet};
