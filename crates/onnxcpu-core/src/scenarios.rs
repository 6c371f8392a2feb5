//! End-to-end checks against real vision models.
//!
//! These need model and image files that are not part of the repository:
//!
//! ```text
//! ONNXCPU_CLASSIFIER_MODEL=... ONNXCPU_CLASSIFIER_IMAGE=... \
//! ONNXCPU_DETECTOR_MODEL=... ONNXCPU_DETECTOR_IMAGE=... \
//!     cargo test -p onnxcpu-core -- --ignored
//! ```

use std::path::PathBuf;

use crate::{ImageTensorizer, MlModelService, ModelConfig, NamedTensors, Normalization, OnnxCpuModel};

fn env_path(key: &str) -> PathBuf {
    std::env::var_os(key)
        .map(PathBuf::from)
        .unwrap_or_else(|| panic!("{key} must point at a test artifact"))
}

fn run_on_image(model: &OnnxCpuModel, image: PathBuf, normalization: Normalization) -> NamedTensors {
    let md = model.metadata().unwrap();
    let input = &md.inputs[0];
    let image = image::open(image).unwrap();

    let tensor = ImageTensorizer::new()
        .with_normalization(normalization)
        .tensorize(&image, input)
        .unwrap();

    let mut tensors = NamedTensors::new();
    tensors.insert(input.name.clone(), tensor);
    model.infer(&tensors).unwrap()
}

#[test]
#[ignore = "needs ONNXCPU_CLASSIFIER_MODEL and ONNXCPU_CLASSIFIER_IMAGE"]
fn test_classifier_scenario() {
    let model = OnnxCpuModel::new(&ModelConfig::new(env_path("ONNXCPU_CLASSIFIER_MODEL"))).unwrap();
    let md = model.metadata().unwrap();
    assert_eq!(md.inputs[0].shape, vec![1, 3, 224, 224]);
    assert_eq!(md.inputs[0].data_type, "float32");
    assert_eq!(md.outputs[0].shape, vec![1, 8]);

    let out = run_on_image(&model, env_path("ONNXCPU_CLASSIFIER_IMAGE"), Normalization::Unit);
    assert_eq!(out.len(), 1);

    let probs = out[&md.outputs[0].name].as_f32().unwrap();
    assert_eq!(probs.shape(), &[1, 8]);
    assert!(probs[[0, 4]] > 0.8, "class 4 scored {}", probs[[0, 4]]);

    model.close().unwrap();
}

#[test]
#[ignore = "needs ONNXCPU_DETECTOR_MODEL and ONNXCPU_DETECTOR_IMAGE"]
fn test_detector_scenario() {
    let model = OnnxCpuModel::new(&ModelConfig::new(env_path("ONNXCPU_DETECTOR_MODEL"))).unwrap();
    let md = model.metadata().unwrap();
    assert_eq!(md.inputs[0].shape, vec![1, 300, 300, 3]);
    assert_eq!(md.inputs[0].data_type, "uint8");
    assert_eq!(md.outputs.len(), 8);

    let out = run_on_image(&model, env_path("ONNXCPU_DETECTOR_IMAGE"), Normalization::None);
    let scores = out["detection_scores"].as_f32().unwrap();
    assert_eq!(scores.shape(), &[1, 100]);
    assert!(scores[[0, 0]] > 0.9);
    assert!(scores[[0, 1]] < 0.5);

    model.close().unwrap();
}
