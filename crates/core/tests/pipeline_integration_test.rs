//! End-to-end evaluation with deterministic in-memory models

use docbin_core::{
    EncoderPreprocessing, EvalConfig, Evaluator, ImageState, InferenceContext, SegmentationModel,
};
use image::{GrayImage, Luma, Rgb, RgbImage};
use ndarray::{Array3, ArrayView4, Axis};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const WIDTH: u32 = 130;
const HEIGHT: u32 = 150;

/// Predicts background where the normalized first channel is bright
struct BrightnessModel(&'static str);

impl SegmentationModel for BrightnessModel {
    fn name(&self) -> &str {
        self.0
    }

    fn predict(&self, batch: ArrayView4<'_, f32>) -> docbin_common::Result<Array3<f32>> {
        Ok(batch
            .index_axis(Axis(1), 0)
            .mapv(|v| 1.0 / (1.0 + (-4.0 * v).exp())))
    }
}

fn mock_context() -> InferenceContext {
    InferenceContext::new(
        [
            Box::new(BrightnessModel("blue")),
            Box::new(BrightnessModel("green")),
            Box::new(BrightnessModel("red")),
            Box::new(BrightnessModel("gray")),
        ],
        Box::new(BrightnessModel("local")),
        Box::new(BrightnessModel("global")),
        EncoderPreprocessing::imagenet(),
    )
}

fn is_ink(row: u32, offset: u32) -> bool {
    (row + offset) % 30 < 10
}

/// Write a page with dark horizontal stripes and its ground truth
fn write_sample(root: &Path, file_name: &str, offset: u32) {
    let page = RgbImage::from_fn(WIDTH, HEIGHT, |_, y| {
        if is_ink(y, offset) {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 250, 245])
        }
    });
    page.save(root.join("image").join(file_name)).unwrap();

    let mask = GrayImage::from_fn(WIDTH, HEIGHT, |_, y| {
        Luma([if is_ink(y, offset) { 0 } else { 255 }])
    });
    mask.save(root.join("mask").join(file_name)).unwrap();
}

fn dataset(names: &[&str]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("image")).unwrap();
    fs::create_dir_all(tmp.path().join("mask")).unwrap();
    for (i, name) in names.iter().enumerate() {
        write_sample(tmp.path(), name, i as u32 * 7);
    }
    fs::write(tmp.path().join("image").join("README.txt"), "not an image").unwrap();
    tmp
}

fn config(dataset_root: &Path, output_root: &Path, fold_num: usize, fold_total: usize) -> EvalConfig {
    EvalConfig::builder()
        .dataset_root(dataset_root)
        .output_root(output_root)
        .fold(fold_num, fold_total)
        .patch_geometry(64, 0.5)
        .global_size(96)
        .batch_size(5)
        .build()
        .unwrap()
}

#[test]
fn test_fold_evaluation_writes_masks_and_table() {
    let data = dataset(&["p1.png", "p2.png", "p3.png"]);
    let out = TempDir::new().unwrap();
    let config = config(data.path(), out.path(), 0, 1);
    let context = mock_context();

    let summary = Evaluator::new(&config, &context).run().unwrap();

    assert_eq!(summary.images.len(), 3);
    for result in &summary.images {
        assert_eq!(result.state, ImageState::Persisted);
        assert!(result.scores.fmeasure > 90.0, "{}: {:?}", result.name, result.scores);

        let mask = image::open(&result.mask_path).unwrap().to_luma8();
        assert_eq!(mask.dimensions(), (WIDTH, HEIGHT));
        assert!(mask.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }
    assert!(summary.mask_dir.ends_with("predicted_image_lrde_0/step2_normal"));

    let table = fs::read_to_string(&summary.metrics_path).unwrap();
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "step2_normal,F-Measure,P-Fmeasure,PSNR,DRD");
    assert!(lines[1].starts_with("p1,"));
    assert!(lines[3].starts_with("p3,"));
    assert!(lines[4].starts_with("average,"));
    assert_eq!(lines[4].split(',').count(), 5);
}

#[test]
fn test_fold_selects_strided_subset() {
    let data = dataset(&["a.png", "b.png", "c.png", "d.png", "e.png", "f.png"]);
    let out = TempDir::new().unwrap();
    let config = config(data.path(), out.path(), 1, 5);
    let context = mock_context();

    let summary = Evaluator::new(&config, &context).run().unwrap();
    let names: Vec<&str> = summary.images.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["b"]);
    assert!(out.path().join("predicted_image_lrde_1/step2_normal/b.png").exists());
}

#[test]
fn test_empty_fold_is_config_error() {
    let data = dataset(&["a.png", "b.png"]);
    let out = TempDir::new().unwrap();
    let config = config(data.path(), out.path(), 3, 5);
    let context = mock_context();

    let err = Evaluator::new(&config, &context).run().unwrap_err();
    assert!(err.is_config_error());
}

#[test]
fn test_unreadable_image_aborts_but_keeps_written_rows() {
    let data = dataset(&["a.png", "c.png"]);
    // Sorted between the two valid pages, corrupt
    fs::write(data.path().join("image").join("b.png"), b"definitely not png").unwrap();
    let out = TempDir::new().unwrap();
    let config = config(data.path(), out.path(), 0, 1);
    let context = mock_context();

    let err = Evaluator::new(&config, &context).run().unwrap_err();
    assert!(matches!(err, docbin_common::BinarizeError::Image(_)));

    let table = fs::read_to_string(config.metrics_path()).unwrap();
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("a,"));
}

#[test]
fn test_undersized_page_is_padded_and_scored() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("image")).unwrap();
    fs::create_dir_all(tmp.path().join("mask")).unwrap();
    let page = RgbImage::from_fn(40, 30, |x, _| if x < 10 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) });
    page.save(tmp.path().join("image/tiny.png")).unwrap();
    let mask = GrayImage::from_fn(40, 30, |x, _| Luma([if x < 10 { 0 } else { 255 }]));
    mask.save(tmp.path().join("mask/tiny.png")).unwrap();

    let out = TempDir::new().unwrap();
    let config = config(tmp.path(), out.path(), 0, 1);
    let context = mock_context();
    let summary = Evaluator::new(&config, &context).run().unwrap();

    let result = &summary.images[0];
    let written = image::open(&result.mask_path).unwrap().to_luma8();
    assert_eq!(written.dimensions(), (40, 30));
    assert!(result.scores.fmeasure > 80.0, "{:?}", result.scores);
}
