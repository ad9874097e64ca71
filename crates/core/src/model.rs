//! Segmentation model seam and its ONNX Runtime implementation
//!
//! All six models share one contract: an `N×3×P×P` normalized batch in, an
//! `N×P×P` probability map in `[0, 1]` out. Models are frozen after loading;
//! [`SegmentationModel::predict`] takes `&self` so a loaded model can be shared
//! by reference for the whole run.

use crate::config::Device;
use docbin_common::{BinarizeError, Result};
use ndarray::{Array3, ArrayView4};
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, ExecutionProviderDispatch,
};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable overriding the intra-op thread count
pub const THREADS_ENV: &str = "DOCBIN_THREADS";

/// A frozen per-pixel segmentation model
pub trait SegmentationModel: Send + Sync {
    /// Human-readable model name used in logs and errors
    fn name(&self) -> &str;

    /// Run one batch
    ///
    /// `batch` is `N×3×H×W`; the result is `N×H×W` probabilities in `[0, 1]`.
    fn predict(&self, batch: ArrayView4<'_, f32>) -> Result<Array3<f32>>;
}

/// Failures specific to running an ONNX segmentation model
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model file not found: {0}")]
    NotFound(PathBuf),

    #[error("Session setup failed: {0}")]
    Session(String),

    #[error("Session lock poisoned")]
    Poisoned,

    #[error("Invalid model output shape: expected [N, 1, H, W] or [N, H, W], got {0:?}")]
    InvalidOutputShape(Vec<i64>),

    #[error("Model returned {got} maps for a batch of {expected}")]
    BatchMismatch { expected: usize, got: usize },

    #[error("Model returned {got_h}x{got_w} maps for {expected_h}x{expected_w} input")]
    SizeMismatch {
        expected_h: usize,
        expected_w: usize,
        got_h: usize,
        got_w: usize,
    },
}

/// Logistic function mapping logits to probabilities
#[inline]
#[must_use]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn execution_providers(device: Device) -> Vec<ExecutionProviderDispatch> {
    let mut providers = Vec::with_capacity(2);
    if let Device::Cuda(idx) = device {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        providers.push(CUDAExecutionProvider::default().with_device_id(idx as i32).build());
    }
    providers.push(CPUExecutionProvider::default().build());
    providers
}

/// Create an ONNX Runtime session tuned for batch inference
///
/// - Level 3 graph optimizations
/// - Intra-op threads from [`THREADS_ENV`], else the physical core count
/// - CUDA execution provider first when a GPU device is selected, CPU fallback
pub fn create_session(model_path: &Path, device: Device) -> std::result::Result<Session, ModelError> {
    let num_threads = std::env::var(THREADS_ENV)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or_else(num_cpus::get_physical);
    debug!("ONNX session: {} intra-op threads on {}", num_threads, device);

    Session::builder()
        .map_err(|e| ModelError::Session(e.to_string()))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| ModelError::Session(e.to_string()))?
        .with_intra_threads(num_threads)
        .map_err(|e| ModelError::Session(e.to_string()))?
        .with_execution_providers(execution_providers(device))
        .map_err(|e| ModelError::Session(e.to_string()))?
        .commit_from_file(model_path)
        .map_err(|e| ModelError::Session(e.to_string()))
}

/// Segmentation model backed by an ONNX Runtime session
pub struct OnnxSegmentationModel {
    name: String,
    /// Session::run requires &mut self
    session: Mutex<Session>,
    apply_sigmoid: bool,
}

impl std::fmt::Debug for OnnxSegmentationModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSegmentationModel")
            .field("name", &self.name)
            .field("session", &"<Session>")
            .field("apply_sigmoid", &self.apply_sigmoid)
            .finish()
    }
}

impl OnnxSegmentationModel {
    /// Load a model from an `.onnx` file
    ///
    /// Set `apply_sigmoid` when the exported graph ends in raw logits.
    pub fn load(
        name: impl Into<String>,
        model_path: &Path,
        device: Device,
        apply_sigmoid: bool,
    ) -> Result<Self> {
        let name = name.into();
        if !model_path.exists() {
            return Err(BinarizeError::model_load(
                name,
                ModelError::NotFound(model_path.to_path_buf()),
            ));
        }
        info!("Loading {} model from {} on {}", name, model_path.display(), device);

        let session =
            create_session(model_path, device).map_err(|e| BinarizeError::model_load(&name, e))?;
        if let Some(input) = session.inputs.first() {
            debug!("{} model input tensor: {}", name, input.name);
        }

        Ok(Self {
            name,
            session: Mutex::new(session),
            apply_sigmoid,
        })
    }
}

impl SegmentationModel for OnnxSegmentationModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, batch: ArrayView4<'_, f32>) -> Result<Array3<f32>> {
        let (n, _, height, width) = batch.dim();
        let contiguous = batch.as_standard_layout();
        let input = TensorRef::from_array_view(contiguous.view())
            .map_err(|e| BinarizeError::inference(&self.name, e))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| BinarizeError::inference(&self.name, ModelError::Poisoned))?;
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| BinarizeError::inference(&self.name, e))?;
        let (out_shape, out_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| BinarizeError::inference(&self.name, e))?;

        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let (out_n, out_h, out_w) = match out_shape.len() {
            3 => (out_shape[0] as usize, out_shape[1] as usize, out_shape[2] as usize),
            4 if out_shape[1] == 1 => {
                (out_shape[0] as usize, out_shape[2] as usize, out_shape[3] as usize)
            }
            _ => {
                return Err(BinarizeError::inference(
                    &self.name,
                    ModelError::InvalidOutputShape(out_shape.to_vec()),
                ))
            }
        };
        if out_n != n {
            return Err(BinarizeError::inference(
                &self.name,
                ModelError::BatchMismatch {
                    expected: n,
                    got: out_n,
                },
            ));
        }
        if (out_h, out_w) != (height, width) {
            return Err(BinarizeError::inference(
                &self.name,
                ModelError::SizeMismatch {
                    expected_h: height,
                    expected_w: width,
                    got_h: out_h,
                    got_w: out_w,
                },
            ));
        }

        let mut maps = Array3::from_shape_vec((out_n, out_h, out_w), out_data.to_vec())
            .map_err(|e| BinarizeError::shape(format!("{} output: {e}", self.name)))?;
        if self.apply_sigmoid {
            maps.mapv_inplace(sigmoid);
        }
        Ok(maps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(20.0) > 0.999);
        assert!(sigmoid(-20.0) < 0.001);
    }

    #[test]
    fn test_load_missing_model_is_model_load_error() {
        let err = OnnxSegmentationModel::load(
            "stage1-blue",
            Path::new("/nonexistent/unet_blue.onnx"),
            Device::Cpu,
            true,
        )
        .unwrap_err();
        assert!(err.is_model_load_error());
        assert!(err.to_string().contains("stage1-blue"));
    }

    #[test]
    fn test_execution_providers_include_cpu_fallback() {
        assert_eq!(execution_providers(Device::Cpu).len(), 1);
        assert_eq!(execution_providers(Device::Cuda(1)).len(), 2);
    }
}
