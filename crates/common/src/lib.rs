//! Common types and utilities for document binarization

pub mod error;
pub mod image_io;

pub use error::{BinarizeError, BoxedSource, Result};
pub use image_io::{is_image_file, load_bgr, load_mask, save_mask};
