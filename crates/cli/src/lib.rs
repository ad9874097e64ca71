//! Argument handling for `docbin-eval`
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! any flag given on the command line.

use anyhow::{Context as _, Result};
use clap::Parser;
use docbin_core::{Device, EvalConfig, EvalConfigBuilder};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "docbin-eval",
    version,
    about = "Evaluate the two-stage document binarization pipeline on one fold",
    after_help = "EXAMPLES:\n  \
                  # Fold 0 of 5 on the first GPU\n  \
                  docbin-eval --gpu 0 --original-dir /data/LRDE --weights-root ./weights\n\n  \
                  # Settings from a file, fold overridden\n  \
                  docbin-eval --config eval.yaml --fold-num 3"
)]
pub struct EvalArgs {
    /// YAML file with base settings
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Inference device: cpu, cuda, cuda:N
    #[arg(long, conflicts_with = "gpu")]
    pub device: Option<Device>,

    /// GPU index (shorthand for --device cuda:N)
    #[arg(long, value_name = "N")]
    pub gpu: Option<usize>,

    /// Encoder backbone name
    #[arg(long)]
    pub base_model_name: Option<String>,

    /// Encoder pretrained weights (selects input normalization)
    #[arg(long)]
    pub encoder_weights: Option<String>,

    /// Fold to evaluate
    #[arg(long)]
    pub fold_num: Option<usize>,

    /// Number of folds
    #[arg(long)]
    pub fold_total: Option<usize>,

    /// Patches per inference call
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Threshold fraction used in the stage-1 weight directory name
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Pixel cut point for binarization (values above become background)
    #[arg(long)]
    pub binarize_cut: Option<u8>,

    /// BCE loss weight used in the weight directory names
    #[arg(long)]
    pub lambda_bce: Option<f64>,

    /// Generator learning rate used in the weight directory names
    #[arg(long)]
    pub generator_lr: Option<f64>,

    /// Dataset root with image/ and mask/ subdirectories
    #[arg(long, value_name = "DIR")]
    pub original_dir: Option<PathBuf>,

    /// Directory containing the step1_*/step2_* weight folders
    #[arg(long, value_name = "DIR")]
    pub weights_root: Option<PathBuf>,

    /// Directory the run output is written under
    #[arg(long, value_name = "DIR")]
    pub output_root: Option<PathBuf>,

    /// Substring a weight file name must contain
    #[arg(long)]
    pub weight_marker: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl EvalArgs {
    /// Resolve the final configuration
    pub fn resolve(&self) -> Result<EvalConfig> {
        let base = match &self.config {
            Some(path) => EvalConfig::from_yaml(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => EvalConfig::default(),
        };
        self.apply(EvalConfigBuilder::from_config(base.clone()), &base)
            .build()
            .context("Invalid evaluation settings")
    }

    fn apply(&self, mut builder: EvalConfigBuilder, base: &EvalConfig) -> EvalConfigBuilder {
        if let Some(device) = self.device {
            builder = builder.device(device);
        }
        if let Some(gpu) = self.gpu {
            builder = builder.device(Device::Cuda(gpu));
        }
        if let Some(name) = &self.base_model_name {
            builder = builder.backbone(name.clone());
        }
        if let Some(weights) = &self.encoder_weights {
            builder = builder.encoder_weights(weights.clone());
        }
        if self.fold_num.is_some() || self.fold_total.is_some() {
            builder = builder.fold(
                self.fold_num.unwrap_or(base.fold_num),
                self.fold_total.unwrap_or(base.fold_total),
            );
        }
        if let Some(batch_size) = self.batch_size {
            builder = builder.batch_size(batch_size);
        }
        if let Some(threshold) = self.threshold {
            builder = builder.threshold(threshold);
        }
        if let Some(cut) = self.binarize_cut {
            builder = builder.binarize_cut(cut);
        }
        if let Some(lambda) = self.lambda_bce {
            builder = builder.lambda_bce(lambda);
        }
        if let Some(lr) = self.generator_lr {
            builder = builder.generator_lr(lr);
        }
        if let Some(dir) = &self.original_dir {
            builder = builder.dataset_root(dir.clone());
        }
        if let Some(dir) = &self.weights_root {
            builder = builder.weights_root(dir.clone());
        }
        if let Some(dir) = &self.output_root {
            builder = builder.output_root(dir.clone());
        }
        if let Some(marker) = &self.weight_marker {
            builder = builder.weight_marker(marker.clone());
        }
        builder
    }
}
