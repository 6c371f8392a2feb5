//! Caller-facing description of a loaded model.

use onnxcpu_inference::{ModelContracts, TensorContract};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name reported for every model.
pub const MODEL_NAME: &str = "onnx_model";

/// Key under which the label path is attached to each output.
pub const LABELS_KEY: &str = "labels";

/// Model name and the tensors it consumes and produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    pub model_name: String,
    pub inputs: Vec<TensorInfo>,
    pub outputs: Vec<TensorInfo>,
}

/// One input or output tensor. Dynamic dimensions are `-1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TensorInfo {
    pub name: String,
    pub data_type: String,
    pub shape: Vec<i64>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl TensorInfo {
    fn from_contract(contract: &TensorContract) -> Self {
        Self {
            name: contract.name.clone(),
            data_type: contract.dtype.label().to_string(),
            shape: contract.shape.clone(),
            extra: Map::new(),
        }
    }

    /// Label file path attached to an output, if any was configured.
    pub fn labels(&self) -> Option<&str> {
        self.extra
            .get(LABELS_KEY)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

impl ModelMetadata {
    /// Project the contracts into metadata, attaching `label_path` (possibly
    /// empty) to every output.
    pub fn build(contracts: &ModelContracts, label_path: &str) -> Self {
        let inputs = contracts.inputs().iter().map(TensorInfo::from_contract).collect();

        let outputs = contracts
            .outputs()
            .iter()
            .map(|contract| {
                let mut info = TensorInfo::from_contract(contract);
                info.extra
                    .insert(LABELS_KEY.to_string(), Value::String(label_path.to_string()));
                info
            })
            .collect();

        Self {
            model_name: MODEL_NAME.to_string(),
            inputs,
            outputs,
        }
    }

    pub fn input(&self, name: &str) -> Option<&TensorInfo> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&TensorInfo> {
        self.outputs.iter().find(|o| o.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onnxcpu_inference::ElementType;
    use pretty_assertions::assert_eq;

    fn contracts() -> ModelContracts {
        ModelContracts::new(
            vec![TensorContract {
                name: "image".to_string(),
                dtype: ElementType::Uint8,
                shape: vec![1, -1, -1, 3],
            }],
            vec![
                TensorContract {
                    name: "detection_scores".to_string(),
                    dtype: ElementType::Float32,
                    shape: vec![1, 100],
                },
                TensorContract {
                    name: "num_detections".to_string(),
                    dtype: ElementType::Float32,
                    shape: vec![1],
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_build() {
        let md = ModelMetadata::build(&contracts(), "/labels.txt");

        assert_eq!(md.model_name, "onnx_model");
        assert_eq!(md.inputs.len(), 1);
        assert_eq!(md.inputs[0].data_type, "uint8");
        assert_eq!(md.inputs[0].shape, vec![1, -1, -1, 3]);
        assert!(md.inputs[0].extra.is_empty());

        assert_eq!(md.outputs.len(), 2);
        assert_eq!(md.outputs[0].name, "detection_scores");
        assert_eq!(md.outputs[0].data_type, "float32");
        assert_eq!(md.outputs[1].labels(), Some("/labels.txt"));
    }

    #[test]
    fn test_empty_label_path_still_attached() {
        let md = ModelMetadata::build(&contracts(), "");

        assert_eq!(md.outputs[0].extra.get("labels"), Some(&Value::String(String::new())));
        assert_eq!(md.outputs[0].labels(), None);
    }

    #[test]
    fn test_json_shape() {
        let md = ModelMetadata::build(&contracts(), "l.txt");
        let json = serde_json::to_value(&md).unwrap();

        assert_eq!(json["modelName"], "onnx_model");
        assert_eq!(json["inputs"][0]["dataType"], "uint8");
        assert!(json["inputs"][0].get("extra").is_none());
        assert_eq!(json["outputs"][1]["extra"]["labels"], "l.txt");
        assert_eq!(json["outputs"][0]["shape"], serde_json::json!([1, 100]));
    }
}
