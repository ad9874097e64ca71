//! Weight file discovery
//!
//! Each stage keeps its exported models in a directory named after the
//! training run (see [`EvalConfig::stage1_weight_dir`] and friends). A file
//! qualifies when its name contains the weight marker; qualifying files are
//! ordered lexicographically by file name, which is what assigns the four
//! stage-1 models to the blue, green, red and gray slots.

use crate::config::EvalConfig;
use docbin_common::{BinarizeError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Number of stage-1 channel models
pub const STAGE1_MODEL_COUNT: usize = 4;

/// List the weight files in `dir` whose names contain `marker`, sorted by name
pub fn discover_weights(dir: &Path, marker: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(BinarizeError::config(format!(
            "weight directory not found: {}",
            dir.display()
        )));
    }

    let mut weights = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.contains(marker));
        if matches && path.is_file() {
            weights.push(path);
        } else {
            debug!("Skipping {} (no '{}' marker)", path.display(), marker);
        }
    }
    weights.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    if weights.is_empty() {
        return Err(BinarizeError::config(format!(
            "no weights containing '{}' in {}",
            marker,
            dir.display()
        )));
    }
    Ok(weights)
}

/// Resolved model files for one fold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightSet {
    /// Blue, green, red, gray
    pub stage1: [PathBuf; STAGE1_MODEL_COUNT],
    pub local: PathBuf,
    pub global: PathBuf,
}

impl WeightSet {
    /// Discover every model the configured fold needs
    ///
    /// Stage 1 must yield exactly four files. The stage-2 directories must
    /// yield at least one; only the first is used.
    pub fn resolve(config: &EvalConfig) -> Result<Self> {
        let stage1_dir = config.stage1_weight_dir();
        let found = discover_weights(&stage1_dir, &config.weight_marker)?;
        let stage1: [PathBuf; STAGE1_MODEL_COUNT] = found.try_into().map_err(|found: Vec<PathBuf>| {
            BinarizeError::config(format!(
                "expected {} stage-1 weights in {}, found {}",
                STAGE1_MODEL_COUNT,
                stage1_dir.display(),
                found.len()
            ))
        })?;
        for (slot, path) in ["blue", "green", "red", "gray"].iter().zip(&stage1) {
            info!("Stage 1 {} weights: {}", slot, path.display());
        }

        let local = first_weight(&config.stage2_local_weight_dir(), &config.weight_marker)?;
        info!("Stage 2 local weights: {}", local.display());
        let global = first_weight(&config.stage2_global_weight_dir(), &config.weight_marker)?;
        info!("Stage 2 global weights: {}", global.display());

        Ok(Self {
            stage1,
            local,
            global,
        })
    }
}

fn first_weight(dir: &Path, marker: &str) -> Result<PathBuf> {
    let mut found = discover_weights(dir, marker)?;
    if found.len() > 1 {
        warn!(
            "{} weights in {}, using the first; ignoring {:?}",
            found.len(),
            dir.display(),
            &found[1..]
        );
    }
    Ok(found.swap_remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "unet_c.onnx");
        touch(tmp.path(), "unet_a.onnx");
        touch(tmp.path(), "log.txt");
        touch(tmp.path(), "unet_b.onnx");

        let names: Vec<String> = discover_weights(tmp.path(), "unet")
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["unet_a.onnx", "unet_b.onnx", "unet_c.onnx"]);
    }

    #[test]
    fn test_missing_directory_is_config_error() {
        let err = discover_weights(Path::new("/nonexistent/weights"), "unet").unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_no_marked_files_is_config_error() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "readme.md");
        assert!(discover_weights(tmp.path(), "unet").unwrap_err().is_config_error());
    }
}
