//! Save/load round trips and inference through a restored checkpoint.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Cursor;

use approx::assert_relative_eq;
use image::{ImageFormat, Rgb, RgbImage};
use tumor_dataset::Preprocessor;
use tumor_models::{
    BurnClassifier, CheckpointFormat, Classifier, CpuBackend, InferenceError, ModelError,
    ModelManifest, Predictor, TumorCnnConfig, cpu_device, load_checkpoint, save_checkpoint,
};
use tumor_types::{ImageBatch, ImageTensor, TargetSize};

fn config() -> TumorCnnConfig {
    TumorCnnConfig::default()
        .with_input(TargetSize::new(24, 24))
        .with_filters([2, 3, 4])
        .with_hidden(6)
}

fn probe_batch() -> ImageBatch {
    let a = ImageTensor::filled(TargetSize::new(24, 24), 0.25);
    let b = ImageTensor::filled(TargetSize::new(24, 24), 0.75);
    ImageBatch::stack(&[&a, &b]).unwrap()
}

#[test]
fn binary_roundtrip_preserves_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let original = BurnClassifier::<CpuBackend>::new(config(), cpu_device()).unwrap();

    let path = save_checkpoint(&original, &dir.path().join("tumor"), CheckpointFormat::Binary).unwrap();
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("bin"));
    assert!(ModelManifest::path_for(&path).exists());

    let restored = load_checkpoint::<CpuBackend>(&path, &cpu_device()).unwrap();
    assert_eq!(restored.config(), original.config());

    let before = original.predict(&probe_batch()).unwrap();
    let after = restored.predict(&probe_batch()).unwrap();
    for (a, b) in before.iter().zip(&after) {
        assert_relative_eq!(*a, *b, epsilon = 1e-6);
    }
}

#[test]
fn json_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let original = BurnClassifier::<CpuBackend>::new(config(), cpu_device()).unwrap();

    let path = save_checkpoint(&original, &dir.path().join("tumor.json"), CheckpointFormat::Json).unwrap();
    let restored = load_checkpoint::<CpuBackend>(&path, &cpu_device()).unwrap();

    let before = original.predict(&probe_batch()).unwrap();
    let after = restored.predict(&probe_batch()).unwrap();
    for (a, b) in before.iter().zip(&after) {
        assert_relative_eq!(*a, *b, epsilon = 1e-6);
    }
}

#[test]
fn missing_manifest_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let original = BurnClassifier::<CpuBackend>::new(config(), cpu_device()).unwrap();
    let path = save_checkpoint(&original, &dir.path().join("tumor"), CheckpointFormat::Binary).unwrap();
    std::fs::remove_file(ModelManifest::path_for(&path)).unwrap();

    let err = load_checkpoint::<CpuBackend>(&path, &cpu_device()).unwrap_err();
    assert!(matches!(err, ModelError::Io(_)));
}

#[test]
fn restored_model_enforces_training_size() {
    let dir = tempfile::tempdir().unwrap();
    let original = BurnClassifier::<CpuBackend>::new(config(), cpu_device()).unwrap();
    let path = save_checkpoint(&original, &dir.path().join("tumor"), CheckpointFormat::Binary).unwrap();
    let restored = load_checkpoint::<CpuBackend>(&path, &cpu_device()).unwrap();

    let err = Predictor::new(&restored, Preprocessor::default()).unwrap_err();
    assert!(matches!(err, InferenceError::SizeMismatch { .. }));

    let predictor = Predictor::new(&restored, Preprocessor::new(TargetSize::new(24, 24))).unwrap();
    let mut bytes = Cursor::new(Vec::new());
    RgbImage::from_pixel(40, 30, Rgb([90, 20, 200]))
        .write_to(&mut bytes, ImageFormat::Png)
        .unwrap();
    let prediction = predictor.predict_bytes(&bytes.into_inner()).unwrap();
    assert!((0.5..=1.0).contains(&prediction.confidence));
}
