//! Fold evaluation driver
//!
//! Images are processed one at a time, in fold order. Each image walks the
//! states below exactly once; any error aborts the whole run, leaving the rows
//! already written in the results table.
//!
//! ```text
//! Pending → Stage1Done → Stage2LocalDone → Stage2GlobalDone → Scored → Persisted
//! ```

use crate::config::EvalConfig;
use crate::context::InferenceContext;
use crate::dataset::{load_fold, Sample};
use crate::fusion::{or_fuse, to_score_mask};
use crate::report::MetricsReport;
use crate::stages::TwoStagePipeline;
use docbin_common::{load_bgr, load_mask, save_mask, Result};
use docbin_metrics::{BinarizationScorer, DibcoScorer, MetricScores};
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// Progress of one image through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImageState {
    Pending,
    Stage1Done,
    Stage2LocalDone,
    Stage2GlobalDone,
    Scored,
    Persisted,
}

impl ImageState {
    /// The state that follows, or `None` once persisted
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Stage1Done),
            Self::Stage1Done => Some(Self::Stage2LocalDone),
            Self::Stage2LocalDone => Some(Self::Stage2GlobalDone),
            Self::Stage2GlobalDone => Some(Self::Scored),
            Self::Scored => Some(Self::Persisted),
            Self::Persisted => None,
        }
    }
}

impl fmt::Display for ImageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Stage1Done => "STAGE1_DONE",
            Self::Stage2LocalDone => "STAGE2_LOCAL_DONE",
            Self::Stage2GlobalDone => "STAGE2_GLOBAL_DONE",
            Self::Scored => "SCORED",
            Self::Persisted => "PERSISTED",
        };
        write!(f, "{s}")
    }
}

/// Per-image record kept after the run
#[derive(Debug, Clone, PartialEq)]
pub struct ImageResult {
    pub name: String,
    pub scores: MetricScores,
    pub mask_path: PathBuf,
    /// Always [`ImageState::Persisted`] for a returned result
    pub state: ImageState,
}

/// Outcome of a completed fold
#[derive(Debug, Clone, PartialEq)]
pub struct EvalSummary {
    pub images: Vec<ImageResult>,
    pub average: MetricScores,
    pub metrics_path: PathBuf,
    pub mask_dir: PathBuf,
}

/// Runs the two-stage pipeline over a fold and records the scores
pub struct Evaluator<'a> {
    config: &'a EvalConfig,
    context: &'a InferenceContext,
    pipeline: TwoStagePipeline,
    scorer: Box<dyn BinarizationScorer + 'a>,
}

impl fmt::Debug for Evaluator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("context", self.context)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl<'a> Evaluator<'a> {
    /// Evaluator scoring with the DIBCO metric suite
    #[must_use]
    pub fn new(config: &'a EvalConfig, context: &'a InferenceContext) -> Self {
        Self::with_scorer(config, context, Box::new(DibcoScorer))
    }

    #[must_use]
    pub fn with_scorer(
        config: &'a EvalConfig,
        context: &'a InferenceContext,
        scorer: Box<dyn BinarizationScorer + 'a>,
    ) -> Self {
        Self {
            config,
            context,
            pipeline: TwoStagePipeline::from_config(config),
            scorer,
        }
    }

    /// Evaluate the configured fold of the dataset
    pub fn run(&self) -> Result<EvalSummary> {
        self.config.validate()?;
        let samples = load_fold(
            &self.config.dataset_root,
            self.config.fold_num,
            self.config.fold_total,
        )?;
        self.run_samples(&samples)
    }

    /// Evaluate an explicit list of samples
    pub fn run_samples(&self, samples: &[Sample]) -> Result<EvalSummary> {
        let mask_dir = self.config.mask_dir();
        std::fs::create_dir_all(&mask_dir)?;
        let metrics_path = self.config.metrics_path();
        let mut report = MetricsReport::create(&metrics_path, &self.config.run_label)?;
        info!(
            "Evaluating {} images; masks -> {}, metrics -> {}",
            samples.len(),
            mask_dir.display(),
            metrics_path.display()
        );

        let mut images = Vec::with_capacity(samples.len());
        for (index, sample) in samples.iter().enumerate() {
            info!("[{}/{}] Processing {}", index + 1, samples.len(), sample.name);
            let result = self.process(sample, &mut report)?;
            images.push(result);
        }

        let average = report.finish()?.unwrap_or_default();
        info!(
            "Average: F={:.4} pF={:.4} PSNR={:.4} DRD={:.4}",
            average.fmeasure, average.pseudo_fmeasure, average.psnr, average.drd
        );
        Ok(EvalSummary {
            images,
            average,
            metrics_path,
            mask_dir,
        })
    }

    fn process(&self, sample: &Sample, report: &mut MetricsReport) -> Result<ImageResult> {
        let start = Instant::now();
        let ctx = self.context;
        let mut state = ImageState::Pending;

        let image = load_bgr(&sample.image_path)?;
        let ground_truth = to_score_mask(&load_mask(&sample.mask_path)?);

        let fused = self.pipeline.stage1.run(ctx, &image)?;
        state = advance(state, &sample.name);

        let local = self.pipeline.local.run(ctx, &fused)?;
        state = advance(state, &sample.name);

        let global = self.pipeline.global.run(ctx, &image)?;
        let mask = or_fuse(&local, &global)?;
        state = advance(state, &sample.name);

        let scores = self.scorer.score(&to_score_mask(&mask), &ground_truth)?;
        state = advance(state, &sample.name);

        let mask_path = self.config.mask_dir().join(format!("{}.png", sample.name));
        save_mask(&mask_path, &mask)?;
        report.append(&sample.name, scores)?;
        state = advance(state, &sample.name);

        info!(
            "{}: F={:.4} pF={:.4} PSNR={:.4} DRD={:.4} ({:.2?})",
            sample.name,
            scores.fmeasure,
            scores.pseudo_fmeasure,
            scores.psnr,
            scores.drd,
            start.elapsed()
        );
        Ok(ImageResult {
            name: sample.name.clone(),
            scores,
            mask_path,
            state,
        })
    }
}

fn advance(state: ImageState, name: &str) -> ImageState {
    let next = state.next().unwrap_or(state);
    debug!("{}: {} -> {}", name, state, next);
    next
}
