//! Tensor contracts discovered from a loaded model.

use std::path::Path;

use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::ValueType;
use tracing::debug;

use crate::error::{InferenceError, Side};
use crate::session::{load_session, SessionOptions};
use crate::tensor::ElementType;
use crate::Result;

/// Name, element type and shape the model declares for one tensor.
///
/// Dynamic dimensions are reported by the engine as `-1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorContract {
    pub name: String,
    pub dtype: ElementType,
    pub shape: Vec<i64>,
}

impl TensorContract {
    /// True if any dimension is only bound at run time.
    pub fn is_dynamic(&self) -> bool {
        self.shape.iter().any(|&d| d < 0)
    }
}

/// Ordered input and output contracts of a model.
///
/// Every tensor on one side shares a single element type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelContracts {
    inputs: Vec<TensorContract>,
    outputs: Vec<TensorContract>,
    input_type: Option<ElementType>,
    output_type: ElementType,
}

impl ModelContracts {
    /// Validate both sides and build the contract set.
    pub fn new(inputs: Vec<TensorContract>, outputs: Vec<TensorContract>) -> Result<Self> {
        let input_type = uniform_type(Side::Input, &inputs)?;
        let output_type = uniform_type(Side::Output, &outputs)?
            .ok_or_else(|| InferenceError::ModelLoad("model declares no outputs".to_string()))?;

        Ok(Self {
            inputs,
            outputs,
            input_type,
            output_type,
        })
    }

    pub fn inputs(&self) -> &[TensorContract] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TensorContract] {
        &self.outputs
    }

    /// Element type shared by all inputs, `None` for a model without inputs.
    pub fn input_type(&self) -> Option<ElementType> {
        self.input_type
    }

    /// Element type shared by all outputs.
    pub fn output_type(&self) -> ElementType {
        self.output_type
    }

    pub fn input_names(&self) -> Vec<&str> {
        self.inputs.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Load the model at `path` and return its contracts.
///
/// The session opened for the query is dropped before returning.
pub fn discover_contracts<P: AsRef<Path>>(path: P) -> Result<ModelContracts> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let session = load_session(&bytes, &SessionOptions::default())?;
    contracts_of(&session)
}

/// Read the contracts of an already loaded session.
pub(crate) fn contracts_of(session: &Session) -> Result<ModelContracts> {
    let inputs = session
        .inputs()
        .iter()
        .map(|i| describe(Side::Input, i.name(), i.dtype()))
        .collect::<Result<Vec<_>>>()?;

    let outputs = session
        .outputs()
        .iter()
        .map(|o| describe(Side::Output, o.name(), o.dtype()))
        .collect::<Result<Vec<_>>>()?;

    debug!("Model inputs: {:?}", inputs);
    debug!("Model outputs: {:?}", outputs);

    ModelContracts::new(inputs, outputs)
}

fn describe(side: Side, name: &str, value_type: &ValueType) -> Result<TensorContract> {
    let unsupported = |dtype: String| InferenceError::UnsupportedType {
        side,
        name: name.to_string(),
        dtype,
    };

    match value_type {
        ValueType::Tensor { ty, shape, .. } => {
            let dtype = match ty {
                TensorElementType::Float32 => ElementType::Float32,
                TensorElementType::Uint8 => ElementType::Uint8,
                other => return Err(unsupported(format!("{:?}", other))),
            };
            Ok(TensorContract {
                name: name.to_string(),
                dtype,
                shape: shape.iter().copied().collect(),
            })
        }
        other => Err(unsupported(format!("{:?}", other))),
    }
}

/// Check that every contract on one side has the same element type.
fn uniform_type(side: Side, contracts: &[TensorContract]) -> Result<Option<ElementType>> {
    let Some(first) = contracts.first() else {
        return Ok(None);
    };

    if let Some(odd) = contracts.iter().find(|c| c.dtype != first.dtype) {
        return Err(InferenceError::MixedType {
            side,
            first: first.dtype,
            other: odd.dtype,
            name: odd.name.clone(),
        });
    }

    Ok(Some(first.dtype))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{DType, Dim, GraphBuilder};
    use pretty_assertions::assert_eq;

    fn contract(name: &str, dtype: ElementType, shape: &[i64]) -> TensorContract {
        TensorContract {
            name: name.to_string(),
            dtype,
            shape: shape.to_vec(),
        }
    }

    #[test]
    fn test_uniform_sides_accepted() {
        let contracts = ModelContracts::new(
            vec![contract("image", ElementType::Uint8, &[1, 300, 300, 3])],
            vec![
                contract("scores", ElementType::Float32, &[1, 100]),
                contract("boxes", ElementType::Float32, &[1, 100, 4]),
            ],
        )
        .unwrap();

        assert_eq!(contracts.input_type(), Some(ElementType::Uint8));
        assert_eq!(contracts.output_type(), ElementType::Float32);
        assert_eq!(contracts.output_names(), vec!["scores", "boxes"]);
    }

    #[test]
    fn test_mixed_outputs_rejected() {
        let err = ModelContracts::new(
            vec![contract("x", ElementType::Float32, &[1])],
            vec![
                contract("a", ElementType::Float32, &[1]),
                contract("b", ElementType::Uint8, &[1]),
            ],
        )
        .unwrap_err();

        match err {
            InferenceError::MixedType { side, name, .. } => {
                assert_eq!(side, Side::Output);
                assert_eq!(name, "b");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_outputs_rejected() {
        let err = ModelContracts::new(vec![], vec![]).unwrap_err();
        assert!(matches!(err, InferenceError::ModelLoad(_)));
    }

    #[test]
    fn test_no_inputs_allowed() {
        let contracts =
            ModelContracts::new(vec![], vec![contract("y", ElementType::Uint8, &[2])]).unwrap();
        assert_eq!(contracts.input_type(), None);
    }

    #[test]
    fn test_discover_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = GraphBuilder::new()
            .input("pixels", DType::Uint8, &[Dim::Fixed(1), Dim::Fixed(4), Dim::Fixed(4), Dim::Fixed(3)])
            .input("extra", DType::Uint8, &[Dim::Symbolic("n")])
            .cast("pixels", "as_float", DType::Float32)
            .cast("extra", "extra_float", DType::Float32)
            .output("as_float", DType::Float32, &[Dim::Fixed(1), Dim::Fixed(4), Dim::Fixed(4), Dim::Fixed(3)])
            .output("extra_float", DType::Float32, &[Dim::Symbolic("n")])
            .write_to(dir.path(), "cast.onnx")
            .unwrap();

        let contracts = discover_contracts(&path).unwrap();

        assert_eq!(
            contracts.inputs(),
            &[
                contract("pixels", ElementType::Uint8, &[1, 4, 4, 3]),
                contract("extra", ElementType::Uint8, &[-1]),
            ]
        );
        assert_eq!(contracts.outputs().len(), 2);
        assert!(contracts.outputs()[1].is_dynamic());
        assert_eq!(contracts.output_type(), ElementType::Float32);
    }

    #[test]
    fn test_discover_rejects_mixed_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let path = GraphBuilder::new()
            .input("a", DType::Float32, &[Dim::Fixed(2)])
            .input("b", DType::Uint8, &[Dim::Fixed(2)])
            .identity("a", "a_out")
            .identity("b", "b_out")
            .output("a_out", DType::Float32, &[Dim::Fixed(2)])
            .output("b_out", DType::Uint8, &[Dim::Fixed(2)])
            .write_to(dir.path(), "mixed.onnx")
            .unwrap();

        let err = discover_contracts(&path).unwrap_err();
        assert!(matches!(err, InferenceError::MixedType { side: Side::Input, .. }));
    }

    #[test]
    fn test_discover_rejects_unsupported_output() {
        // uint8 in, int64 out: the output side must be validated on its own.
        let dir = tempfile::tempdir().unwrap();
        let path = GraphBuilder::new()
            .input("x", DType::Uint8, &[Dim::Fixed(3)])
            .cast("x", "y", DType::Int64)
            .output("y", DType::Int64, &[Dim::Fixed(3)])
            .write_to(dir.path(), "int64.onnx")
            .unwrap();

        let err = discover_contracts(&path).unwrap_err();
        match err {
            InferenceError::UnsupportedType { side, name, .. } => {
                assert_eq!(side, Side::Output);
                assert_eq!(name, "y");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_discover_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.onnx");
        std::fs::write(&path, b"definitely not a protobuf").unwrap();

        let err = discover_contracts(&path).unwrap_err();
        assert!(matches!(err, InferenceError::ModelLoad(_)));
    }
}
