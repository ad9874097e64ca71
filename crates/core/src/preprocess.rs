//! Encoder input preprocessing
//!
//! The segmentation models share a 3-channel encoder pretrained on natural
//! images, so every input is normalized with that encoder's statistics before
//! inference. The contract mirrors the usual encoder preprocessing function:
//!
//! 1. If the caller's channel order differs from the encoder's, reverse the
//!    channel axis (single-channel rasters are unaffected).
//! 2. If the encoder expects `[0, 1]` input and the raster's maximum exceeds
//!    1, divide by 255. The check is made per raster, so an all-dark patch is
//!    left unscaled.
//! 3. Subtract the per-channel mean and divide by the per-channel std. A
//!    single-channel raster is broadcast against the three statistics, which
//!    is how one colour plane becomes a 3-channel encoder input.
//!
//! Output tensors are CHW `f32` with exactly three channels.

use crate::config::EvalConfig;
use docbin_common::{BinarizeError, Result};
use ndarray::{Array3, ArrayView3, Axis};

/// ImageNet channel means in RGB order
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations in RGB order
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Channel order of a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSpace {
    Rgb,
    Bgr,
}

/// Normalization expected by a pretrained encoder
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderPreprocessing {
    /// Channel order the encoder was trained on
    pub input_space: InputSpace,
    /// Upper bound of the encoder's input range (1.0 or 255.0)
    pub input_range_max: f32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for EncoderPreprocessing {
    fn default() -> Self {
        Self::imagenet()
    }
}

impl EncoderPreprocessing {
    /// Statistics of ImageNet-pretrained encoders
    #[must_use]
    pub const fn imagenet() -> Self {
        Self {
            input_space: InputSpace::Rgb,
            input_range_max: 1.0,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }

    /// Resolve the preprocessing for an encoder backbone and its pretrained weights
    pub fn for_encoder(backbone: &str, weights: &str) -> Result<Self> {
        match weights.to_lowercase().as_str() {
            "imagenet" | "ssl" | "swsl" | "noisy-student" | "instagram" => Ok(Self::imagenet()),
            "advprop" => Ok(Self {
                input_space: InputSpace::Rgb,
                input_range_max: 1.0,
                mean: [0.5, 0.5, 0.5],
                std: [0.5, 0.5, 0.5],
            }),
            other => Err(BinarizeError::config(format!(
                "no input normalization known for {backbone} with '{other}' weights"
            ))),
        }
    }

    /// Resolve from the run configuration
    pub fn from_config(config: &EvalConfig) -> Result<Self> {
        Self::for_encoder(&config.backbone, &config.encoder_weights)
    }

    /// Normalize an HWC raster with one or three channels into a CHW tensor
    pub fn apply(&self, pixels: ArrayView3<'_, f32>, source: InputSpace) -> Result<Array3<f32>> {
        let (height, width, channels) = pixels.dim();
        if channels != 1 && channels != 3 {
            return Err(BinarizeError::preprocessing(format!(
                "expected 1 or 3 channels, got {channels}"
            )));
        }

        let reverse = channels == 3 && source != self.input_space;
        let max = pixels.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let scale = if self.input_range_max <= 1.0 && max > 1.0 {
            1.0 / 255.0
        } else {
            1.0
        };

        let mut tensor = Array3::<f32>::zeros((3, height, width));
        for (out_c, mut plane) in tensor.axis_iter_mut(Axis(0)).enumerate() {
            let src_c = match (channels, reverse) {
                (1, _) => 0,
                (_, true) => 2 - out_c,
                (_, false) => out_c,
            };
            let mean = self.mean[out_c];
            let std = self.std[out_c];
            plane.assign(&pixels.index_axis(Axis(2), src_c));
            plane.mapv_inplace(|v| (v * scale - mean) / std);
        }
        Ok(tensor)
    }
}

/// Which view of a BGR patch a model is fed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelInput {
    /// Raw blue plane
    Blue,
    /// Raw green plane
    Green,
    /// Raw red plane
    Red,
    /// Luminance plane
    Gray,
    /// Full colour patch in BGR order
    Bgr,
}

impl ChannelInput {
    /// Stage-1 channel slots in model order
    pub const STAGE1: [ChannelInput; 4] = [
        ChannelInput::Blue,
        ChannelInput::Green,
        ChannelInput::Red,
        ChannelInput::Gray,
    ];

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Red => "red",
            Self::Gray => "gray",
            Self::Bgr => "bgr",
        }
    }

    /// Build the normalized CHW model input for one BGR patch
    pub fn prepare(&self, patch: &Array3<u8>, preprocessing: &EncoderPreprocessing) -> Result<Array3<f32>> {
        let (_, _, channels) = patch.dim();
        if channels != 3 {
            return Err(BinarizeError::preprocessing(format!(
                "expected a 3-channel BGR patch, got {channels} channels"
            )));
        }
        let pixels = patch.mapv(f32::from);
        match self {
            Self::Blue | Self::Green | Self::Red => {
                let c = match self {
                    Self::Blue => 0,
                    Self::Green => 1,
                    _ => 2,
                };
                let plane = pixels.index_axis(Axis(2), c).insert_axis(Axis(2));
                preprocessing.apply(plane, InputSpace::Rgb)
            }
            Self::Gray => {
                let gray = bgr_to_gray(&pixels).insert_axis(Axis(2));
                preprocessing.apply(gray.view(), InputSpace::Rgb)
            }
            Self::Bgr => preprocessing.apply(pixels.view(), InputSpace::Bgr),
        }
    }
}

/// Float luminance of a BGR raster (`0.299 R + 0.587 G + 0.114 B`, unrounded)
#[must_use]
pub fn bgr_to_gray(pixels: &Array3<f32>) -> ndarray::Array2<f32> {
    let blue = pixels.index_axis(Axis(2), 0);
    let green = pixels.index_axis(Axis(2), 1);
    let red = pixels.index_axis(Axis(2), 2);
    let mut gray = blue.mapv(|b| 0.114 * b);
    gray.zip_mut_with(&green, |g, &v| *g += 0.587 * v);
    gray.zip_mut_with(&red, |g, &v| *g += 0.299 * v);
    gray
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-4, "{a} != {b}");
    }

    #[test]
    fn test_single_channel_is_broadcast_to_three() {
        let pre = EncoderPreprocessing::imagenet();
        let pixels = Array3::from_elem((2, 2, 1), 255.0f32);
        let tensor = pre.apply(pixels.view(), InputSpace::Rgb).unwrap();

        assert_eq!(tensor.dim(), (3, 2, 2));
        for c in 0..3 {
            assert_close(tensor[[c, 0, 0]], (1.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c]);
        }
    }

    #[test]
    fn test_bgr_source_is_reversed_to_rgb() {
        let pre = EncoderPreprocessing::imagenet();
        let mut pixels = Array3::zeros((1, 1, 3));
        pixels[[0, 0, 0]] = 255.0; // blue
        let tensor = pre.apply(pixels.view(), InputSpace::Bgr).unwrap();

        // Blue lands in the encoder's third (B) channel
        assert_close(tensor[[2, 0, 0]], (1.0 - IMAGENET_MEAN[2]) / IMAGENET_STD[2]);
        assert_close(tensor[[0, 0, 0]], (0.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0]);
    }

    #[test]
    fn test_dark_raster_is_not_rescaled() {
        let pre = EncoderPreprocessing::imagenet();
        let pixels = Array3::from_elem((1, 1, 1), 1.0f32);
        let tensor = pre.apply(pixels.view(), InputSpace::Rgb).unwrap();
        assert_close(tensor[[0, 0, 0]], (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0]);
    }

    #[test]
    fn test_rejects_two_channel_raster() {
        let pre = EncoderPreprocessing::imagenet();
        let pixels = Array3::zeros((1, 1, 2));
        assert!(pre.apply(pixels.view(), InputSpace::Rgb).is_err());
    }

    #[test]
    fn test_for_encoder_lookup() {
        assert_eq!(
            EncoderPreprocessing::for_encoder("efficientnet-b4", "imagenet").unwrap(),
            EncoderPreprocessing::imagenet()
        );
        assert_eq!(
            EncoderPreprocessing::for_encoder("efficientnet-b4", "advprop").unwrap().mean,
            [0.5, 0.5, 0.5]
        );
        assert!(EncoderPreprocessing::for_encoder("resnet34", "random")
            .unwrap_err()
            .is_config_error());
    }

    #[test]
    fn test_bgr_to_gray_weights() {
        let mut pixels = Array3::zeros((1, 1, 3));
        pixels[[0, 0, 0]] = 100.0;
        pixels[[0, 0, 1]] = 50.0;
        pixels[[0, 0, 2]] = 200.0;
        let gray = bgr_to_gray(&pixels);
        assert_close(gray[[0, 0]], 0.114 * 100.0 + 0.587 * 50.0 + 0.299 * 200.0);
    }

    #[test]
    fn test_channel_inputs_select_expected_plane() {
        let pre = EncoderPreprocessing::imagenet();
        let mut patch = Array3::<u8>::zeros((1, 1, 3));
        patch[[0, 0, 2]] = 255; // red only

        let red = ChannelInput::Red.prepare(&patch, &pre).unwrap();
        let blue = ChannelInput::Blue.prepare(&patch, &pre).unwrap();
        assert_close(red[[0, 0, 0]], (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0]);
        // Blue plane is all zero: max <= 1 so no rescale, value stays 0
        assert_close(blue[[1, 0, 0]], (0.0 - IMAGENET_MEAN[1]) / IMAGENET_STD[1]);

        let bgr = ChannelInput::Bgr.prepare(&patch, &pre).unwrap();
        assert_close(bgr[[0, 0, 0]], (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0]);
        assert_close(bgr[[2, 0, 0]], (0.0 - IMAGENET_MEAN[2]) / IMAGENET_STD[2]);
    }
}
