//! Evaluation configuration
//!
//! Every knob of a run lives in [`EvalConfig`]. Defaults reproduce the
//! reference LRDE setup (efficientnet-b4 encoder, 256×256 tiles at 50%
//! overlap, 512×512 global view, cut point 128).
//!
//! Two thresholds exist and must not be conflated:
//! - [`EvalConfig::threshold`] (default 0.30) only participates in the stage-1
//!   weight directory name.
//! - [`EvalConfig::binarize_cut`] (default 128) is the absolute pixel value
//!   that separates the two mask classes.

use docbin_common::{BinarizeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Device the ONNX sessions run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Device {
    /// CPU inference
    #[default]
    Cpu,
    /// CUDA GPU inference (device index)
    Cuda(usize),
}

impl fmt::Display for Device {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(idx) => write!(f, "cuda:{idx}"),
        }
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda(0)),
            s => {
                let idx_str = s
                    .strip_prefix("cuda:")
                    .or_else(|| s.strip_prefix("gpu:"))
                    .ok_or_else(|| format!("Unknown device '{s}'. Expected: cpu, cuda, cuda:N"))?;
                idx_str.parse::<usize>().map(Self::Cuda).map_err(|_| {
                    format!("Invalid CUDA device index '{idx_str}'. Expected: cuda:N")
                })
            }
        }
    }
}

impl TryFrom<String> for Device {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Device> for String {
    fn from(device: Device) -> Self {
        device.to_string()
    }
}

/// Full configuration of an evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Device for all six models
    pub device: Device,
    /// Encoder backbone identifier, e.g. `efficientnet-b4`
    pub backbone: String,
    /// Encoder pretrained-weight identifier, selects the input normalization
    pub encoder_weights: String,
    /// Index of the evaluated fold
    pub fold_num: usize,
    /// Number of folds the sorted dataset is split into
    pub fold_total: usize,
    /// Patches per inference call
    pub batch_size: usize,
    /// Mask threshold fraction used in the stage-1 weight directory name
    pub threshold: f64,
    /// Absolute cut point: values above it become 255, the rest 0
    pub binarize_cut: u8,
    /// BCE loss weight used in the weight directory names
    pub lambda_bce: f64,
    /// Generator learning rate used in the weight directory names
    pub generator_lr: f64,
    /// Dataset root containing `image/` and `mask/`
    pub dataset_root: PathBuf,
    /// Directory holding the `step1_*` / `step2_*` weight folders
    pub weights_root: PathBuf,
    /// Directory under which the run directory is created
    pub output_root: PathBuf,
    /// Substring a weight file name must contain to be considered
    pub weight_marker: String,
    /// Label of the results table's first column and of the mask subdirectory
    pub run_label: String,
    /// Square tile edge in pixels
    pub patch_size: usize,
    /// Fraction of a tile shared with its neighbour, in [0, 1)
    pub overlap: f64,
    /// Square side of the global-view resize
    pub global_size: usize,
    /// Side of the square erosion kernel applied to the global mask
    pub erode_kernel: usize,
    /// Fill value for the part of a tile that lies outside a tiny image
    pub pad_value: u8,
    /// Apply a sigmoid to raw model outputs (models exported without activation)
    pub apply_sigmoid: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            device: Device::Cpu,
            backbone: "efficientnet-b4".to_string(),
            encoder_weights: "imagenet".to_string(),
            fold_num: 0,
            fold_total: 5,
            batch_size: 16,
            threshold: 0.30,
            binarize_cut: 128,
            lambda_bce: 50.0,
            generator_lr: 2e-4,
            dataset_root: PathBuf::from("/mnt/nas/data/denoise/LRDE/"),
            weights_root: PathBuf::from("."),
            output_root: PathBuf::from("."),
            weight_marker: "unet".to_string(),
            run_label: "step2_normal".to_string(),
            patch_size: 256,
            overlap: 0.5,
            global_size: 512,
            erode_kernel: 7,
            pad_value: 255,
            apply_sigmoid: true,
        }
    }
}

impl EvalConfig {
    /// Create a builder starting from the reference defaults
    #[inline]
    #[must_use = "returns a new builder with default settings"]
    pub fn builder() -> EvalConfigBuilder {
        EvalConfigBuilder::new()
    }

    /// Load a configuration from a YAML file; missing keys keep their defaults
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            BinarizeError::config(format!("failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.fold_total == 0 {
            return Err(BinarizeError::config("fold_total must be at least 1"));
        }
        if self.fold_num >= self.fold_total {
            return Err(BinarizeError::config(format!(
                "fold_num {} must be smaller than fold_total {}",
                self.fold_num, self.fold_total
            )));
        }
        if self.batch_size == 0 {
            return Err(BinarizeError::config("batch_size must be at least 1"));
        }
        if self.patch_size == 0 {
            return Err(BinarizeError::config("patch_size must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.overlap) {
            return Err(BinarizeError::config(format!(
                "overlap must lie in [0, 1), got {}",
                self.overlap
            )));
        }
        if self.global_size == 0 {
            return Err(BinarizeError::config("global_size must be at least 1"));
        }
        if self.erode_kernel == 0 || self.erode_kernel % 2 == 0 || self.erode_kernel > 511 {
            return Err(BinarizeError::config(format!(
                "erode_kernel must be odd and in 1..=511, got {}",
                self.erode_kernel
            )));
        }
        if self.backbone.is_empty() {
            return Err(BinarizeError::config("backbone must not be empty"));
        }
        if self.run_label.is_empty() {
            return Err(BinarizeError::config("run_label must not be empty"));
        }
        Ok(())
    }

    /// `{backbone}_{lambda}_{lr}` shared by every weight directory name
    fn weight_dir_suffix(&self) -> String {
        format!(
            "{}_{}_{}",
            self.backbone,
            self.lambda_bce.trunc() as i64,
            self.generator_lr
        )
    }

    /// Directory holding the four stage-1 channel models
    #[must_use]
    pub fn stage1_weight_dir(&self) -> PathBuf {
        self.weights_root.join(format!(
            "step1_LRDE{}_{}_{}",
            self.fold_num,
            self.weight_dir_suffix(),
            self.threshold
        ))
    }

    /// Directory holding the stage-2 local model
    #[must_use]
    pub fn stage2_local_weight_dir(&self) -> PathBuf {
        self.weights_root.join(format!(
            "step2_LRDE{}_{}",
            self.fold_num,
            self.weight_dir_suffix()
        ))
    }

    /// Directory holding the stage-2 global model
    #[must_use]
    pub fn stage2_global_weight_dir(&self) -> PathBuf {
        self.weights_root.join(format!(
            "step2_resize_lrde_{}_{}",
            self.fold_num,
            self.weight_dir_suffix()
        ))
    }

    /// Per-run output directory (`predicted_image_lrde_{fold}`)
    #[must_use]
    pub fn run_dir(&self) -> PathBuf {
        self.output_root
            .join(format!("predicted_image_lrde_{}", self.fold_num))
    }

    /// Directory the fused masks are written to
    #[must_use]
    pub fn mask_dir(&self) -> PathBuf {
        self.run_dir().join(&self.run_label)
    }

    /// Path of the results table
    #[must_use]
    pub fn metrics_path(&self) -> PathBuf {
        self.run_dir().join("metrics.csv")
    }
}

/// Builder for [`EvalConfig`]
#[derive(Debug, Clone, Default)]
pub struct EvalConfigBuilder {
    config: EvalConfig,
}

impl EvalConfigBuilder {
    #[inline]
    #[must_use = "returns a new builder with default settings"]
    pub fn new() -> Self {
        Self {
            config: EvalConfig::default(),
        }
    }

    /// Start from an existing configuration (e.g. one loaded from YAML)
    #[inline]
    #[must_use = "builder methods return a new builder"]
    pub fn from_config(config: EvalConfig) -> Self {
        Self { config }
    }

    #[inline]
    #[must_use = "builder methods return a new builder"]
    pub fn device(mut self, device: Device) -> Self {
        self.config.device = device;
        self
    }

    #[inline]
    #[must_use = "builder methods return a new builder"]
    pub fn backbone(mut self, backbone: impl Into<String>) -> Self {
        self.config.backbone = backbone.into();
        self
    }

    #[inline]
    #[must_use = "builder methods return a new builder"]
    pub fn encoder_weights(mut self, weights: impl Into<String>) -> Self {
        self.config.encoder_weights = weights.into();
        self
    }

    #[inline]
    #[must_use = "builder methods return a new builder"]
    pub fn fold(mut self, fold_num: usize, fold_total: usize) -> Self {
        self.config.fold_num = fold_num;
        self.config.fold_total = fold_total;
        self
    }

    #[inline]
    #[must_use = "builder methods return a new builder"]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    #[inline]
    #[must_use = "builder methods return a new builder"]
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.config.threshold = threshold;
        self
    }

    #[inline]
    #[must_use = "builder methods return a new builder"]
    pub fn binarize_cut(mut self, cut: u8) -> Self {
        self.config.binarize_cut = cut;
        self
    }

    #[inline]
    #[must_use = "builder methods return a new builder"]
    pub fn lambda_bce(mut self, lambda_bce: f64) -> Self {
        self.config.lambda_bce = lambda_bce;
        self
    }

    #[inline]
    #[must_use = "builder methods return a new builder"]
    pub fn generator_lr(mut self, lr: f64) -> Self {
        self.config.generator_lr = lr;
        self
    }

    #[inline]
    #[must_use = "builder methods return a new builder"]
    pub fn dataset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.dataset_root = root.into();
        self
    }

    #[inline]
    #[must_use = "builder methods return a new builder"]
    pub fn weights_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.weights_root = root.into();
        self
    }

    #[inline]
    #[must_use = "builder methods return a new builder"]
    pub fn output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.output_root = root.into();
        self
    }

    #[inline]
    #[must_use = "builder methods return a new builder"]
    pub fn weight_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.weight_marker = marker.into();
        self
    }

    #[inline]
    #[must_use = "builder methods return a new builder"]
    pub fn run_label(mut self, label: impl Into<String>) -> Self {
        self.config.run_label = label.into();
        self
    }

    #[inline]
    #[must_use = "builder methods return a new builder"]
    pub fn patch_geometry(mut self, patch_size: usize, overlap: f64) -> Self {
        self.config.patch_size = patch_size;
        self.config.overlap = overlap;
        self
    }

    #[inline]
    #[must_use = "builder methods return a new builder"]
    pub fn global_size(mut self, size: usize) -> Self {
        self.config.global_size = size;
        self
    }

    #[inline]
    #[must_use = "builder methods return a new builder"]
    pub fn erode_kernel(mut self, kernel: usize) -> Self {
        self.config.erode_kernel = kernel;
        self
    }

    #[inline]
    #[must_use = "builder methods return a new builder"]
    pub fn pad_value(mut self, value: u8) -> Self {
        self.config.pad_value = value;
        self
    }

    #[inline]
    #[must_use = "builder methods return a new builder"]
    pub fn apply_sigmoid(mut self, apply: bool) -> Self {
        self.config.apply_sigmoid = apply;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<EvalConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_display() {
        assert_eq!(Device::Cpu.to_string(), "cpu");
        assert_eq!(Device::Cuda(0).to_string(), "cuda:0");
        assert_eq!(Device::Cuda(1).to_string(), "cuda:1");
    }

    #[test]
    fn test_device_from_str() {
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("CUDA".parse::<Device>().unwrap(), Device::Cuda(0));
        assert_eq!("cuda:3".parse::<Device>().unwrap(), Device::Cuda(3));
        assert_eq!("gpu:1".parse::<Device>().unwrap(), Device::Cuda(1));
        assert!("cuda:x".parse::<Device>().is_err());
        assert!("tpu".parse::<Device>().is_err());
    }

    #[test]
    fn test_default_weight_dirs_follow_naming_convention() {
        let config = EvalConfig::default();
        assert_eq!(
            config.stage1_weight_dir(),
            PathBuf::from("./step1_LRDE0_efficientnet-b4_50_0.0002_0.3")
        );
        assert_eq!(
            config.stage2_local_weight_dir(),
            PathBuf::from("./step2_LRDE0_efficientnet-b4_50_0.0002")
        );
        assert_eq!(
            config.stage2_global_weight_dir(),
            PathBuf::from("./step2_resize_lrde_0_efficientnet-b4_50_0.0002")
        );
        assert_eq!(config.run_dir(), PathBuf::from("./predicted_image_lrde_0"));
        assert_eq!(
            config.mask_dir(),
            PathBuf::from("./predicted_image_lrde_0/step2_normal")
        );
    }

    #[test]
    fn test_builder_overrides_and_validates() {
        let config = EvalConfig::builder()
            .fold(3, 5)
            .batch_size(4)
            .device(Device::Cuda(1))
            .build()
            .unwrap();
        assert_eq!(config.fold_num, 3);
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.device, Device::Cuda(1));
        assert!(config.stage2_local_weight_dir().ends_with("step2_LRDE3_efficientnet-b4_50_0.0002"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(EvalConfig::builder().fold(5, 5).build().unwrap_err().is_config_error());
        assert!(EvalConfig::builder().fold(0, 0).build().is_err());
        assert!(EvalConfig::builder().batch_size(0).build().is_err());
        assert!(EvalConfig::builder().patch_geometry(256, 1.0).build().is_err());
        assert!(EvalConfig::builder().patch_geometry(0, 0.5).build().is_err());
        assert!(EvalConfig::builder().erode_kernel(6).build().is_err());
    }

    #[test]
    fn test_from_yaml_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eval.yaml");
        std::fs::write(
            &path,
            "device: cuda:1\nfold_num: 2\nbatch_size: 8\ndataset_root: /data/lrde\n",
        )
        .unwrap();

        let config = EvalConfig::from_yaml(&path).unwrap();
        assert_eq!(config.device, Device::Cuda(1));
        assert_eq!(config.fold_num, 2);
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.dataset_root, PathBuf::from("/data/lrde"));
        assert_eq!(config.binarize_cut, 128);
        assert_eq!(config.patch_size, 256);
    }

    #[test]
    fn test_from_yaml_rejects_invalid_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eval.yaml");
        std::fs::write(&path, "device: quantum\n").unwrap();
        assert!(EvalConfig::from_yaml(&path).unwrap_err().is_config_error());
    }
}
