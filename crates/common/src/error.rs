//! Error types shared by every docbin crate
//!
//! All library APIs return [`Result<T>`], which wraps [`BinarizeError`].
//! Errors are grouped by the stage where they occur so the evaluator can
//! report a useful diagnostic before aborting the run.
//!
//! # Error Categories
//!
//! - **Configuration** ([`Config`]): bad settings, missing weight directories,
//!   empty folds. Always raised before any image is processed.
//! - **Model** ([`ModelLoad`], [`Inference`]): ONNX session creation or
//!   execution failures.
//! - **Processing** ([`Preprocessing`], [`Shape`]): tensor construction and
//!   patch-grid bookkeeping. A [`Shape`] error means an internal invariant broke.
//! - **I/O** ([`Image`], [`Report`], [`Io`]): decoding, encoding and file system.
//!
//! [`Config`]: BinarizeError::Config
//! [`ModelLoad`]: BinarizeError::ModelLoad
//! [`Inference`]: BinarizeError::Inference
//! [`Preprocessing`]: BinarizeError::Preprocessing
//! [`Shape`]: BinarizeError::Shape
//! [`Image`]: BinarizeError::Image
//! [`Report`]: BinarizeError::Report
//! [`Io`]: BinarizeError::Io

use thiserror::Error;

/// Boxed source error carried by model failures
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while evaluating the binarization pipeline
#[derive(Debug, Error)]
pub enum BinarizeError {
    /// Invalid or incomplete configuration
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    /// Model could not be loaded
    #[error("Failed to load {model_name} model: {source}")]
    ModelLoad {
        model_name: String,
        #[source]
        source: BoxedSource,
    },

    /// Model execution failed or returned an unexpected tensor
    #[error("Inference failed for {model_name}: {source}")]
    Inference {
        model_name: String,
        #[source]
        source: BoxedSource,
    },

    /// Input tensor could not be built
    #[error("Preprocessing failed: {reason}")]
    Preprocessing { reason: String },

    /// Patch grid, placement or raster dimensions disagree
    #[error("Shape mismatch: {reason}")]
    Shape { reason: String },

    /// Image decode/encode failure
    #[error("Image error: {0}")]
    Image(String),

    /// Results table could not be written
    #[error("Report error: {0}")]
    Report(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for BinarizeError {
    fn from(err: image::ImageError) -> Self {
        BinarizeError::Image(err.to_string())
    }
}

impl BinarizeError {
    /// Build a [`BinarizeError::Config`] from anything printable
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Build a [`BinarizeError::Shape`] from anything printable
    pub fn shape(reason: impl Into<String>) -> Self {
        Self::Shape {
            reason: reason.into(),
        }
    }

    /// Build a [`BinarizeError::Preprocessing`] from anything printable
    pub fn preprocessing(reason: impl Into<String>) -> Self {
        Self::Preprocessing {
            reason: reason.into(),
        }
    }

    /// Wrap a model loading failure
    pub fn model_load<E>(model_name: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ModelLoad {
            model_name: model_name.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a model execution failure
    pub fn inference<E>(model_name: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Inference {
            model_name: model_name.into(),
            source: Box::new(source),
        }
    }

    #[inline]
    #[must_use = "this method returns a boolean, not modifying the error"]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    #[inline]
    #[must_use = "this method returns a boolean, not modifying the error"]
    pub const fn is_model_load_error(&self) -> bool {
        matches!(self, Self::ModelLoad { .. })
    }

    #[inline]
    #[must_use = "this method returns a boolean, not modifying the error"]
    pub const fn is_inference_error(&self) -> bool {
        matches!(self, Self::Inference { .. })
    }

    /// Shape errors signal a broken patch-grid invariant, never bad user input
    #[inline]
    #[must_use = "this method returns a boolean, not modifying the error"]
    pub const fn is_shape_error(&self) -> bool {
        matches!(self, Self::Shape { .. })
    }

    #[inline]
    #[must_use = "this method returns a boolean, not modifying the error"]
    pub const fn is_io_error(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// Result type for binarization operations
pub type Result<T> = std::result::Result<T, BinarizeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn make_test_error() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotFound, "test error")
    }

    #[test]
    fn test_config_error_display() {
        let err = BinarizeError::config("fold_num 5 >= fold_total 5");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: fold_num 5 >= fold_total 5"
        );
        assert!(err.is_config_error());
        assert!(!err.is_io_error());
    }

    #[test]
    fn test_model_load_error_has_source() {
        let err = BinarizeError::model_load("stage1-blue", make_test_error());
        let msg = err.to_string();
        assert!(msg.contains("Failed to load stage1-blue model"));
        assert!(msg.contains("test error"));
        assert!(err.source().is_some());
        assert!(err.is_model_load_error());
    }

    #[test]
    fn test_inference_error_has_source() {
        let err = BinarizeError::inference("stage2-global", make_test_error());
        assert!(err.to_string().contains("Inference failed for stage2-global"));
        assert!(err.source().is_some());
        assert!(err.is_inference_error());
    }

    #[test]
    fn test_shape_error_no_source() {
        let err = BinarizeError::shape("9 patches but 8 placements");
        assert!(err.source().is_none());
        assert!(err.is_shape_error());
    }

    #[test]
    fn test_from_io_error() {
        let err: BinarizeError = make_test_error().into();
        assert!(err.is_io_error());
        assert!(err.to_string().contains("IO error"));
    }
}
