//! Conversion between caller tensors and native ONNX Runtime values.

use ndarray::{ArrayD, IxDyn};
use ort::session::SessionInputValue;
use ort::tensor::PrimitiveTensorElementType;
use ort::value::Tensor as OrtTensor;

use crate::contract::TensorContract;
use crate::error::InferenceError;
use crate::tensor::{ElementType, NamedTensors, Tensor};
use crate::Result;

/// A Rust scalar that maps onto one supported [`ElementType`].
pub(crate) trait NativeElement:
    PrimitiveTensorElementType + Copy + std::fmt::Debug + Send + Sync + 'static
{
    const TYPE: ElementType;

    fn array(tensor: &Tensor) -> Option<&ArrayD<Self>>;

    fn wrap(arr: ArrayD<Self>) -> Tensor;
}

impl NativeElement for f32 {
    const TYPE: ElementType = ElementType::Float32;

    fn array(tensor: &Tensor) -> Option<&ArrayD<f32>> {
        tensor.as_f32()
    }

    fn wrap(arr: ArrayD<f32>) -> Tensor {
        Tensor::Float32(arr)
    }
}

impl NativeElement for u8 {
    const TYPE: ElementType = ElementType::Uint8;

    fn array(tensor: &Tensor) -> Option<&ArrayD<u8>> {
        tensor.as_u8()
    }

    fn wrap(arr: ArrayD<u8>) -> Tensor {
        Tensor::Uint8(arr)
    }
}

/// Copy the caller's tensors into native values, in contract order.
///
/// Keys not named by any contract are ignored. No numeric conversion is done:
/// a tensor of the wrong element type is rejected.
pub(crate) fn to_native<'c, T: NativeElement>(
    tensors: &NamedTensors,
    contracts: &'c [TensorContract],
) -> Result<Vec<(&'c str, SessionInputValue<'static>)>> {
    contracts
        .iter()
        .map(|contract| {
            let name = contract.name.as_str();
            let tensor = tensors.get(name).ok_or_else(|| InferenceError::MissingInput {
                name: name.to_string(),
            })?;

            let arr = T::array(tensor).ok_or_else(|| InferenceError::TypeMismatch {
                name: name.to_string(),
                expected: T::TYPE,
                actual: tensor.dtype(),
            })?;

            let shape: Vec<i64> = arr.shape().iter().map(|&s| s as i64).collect();
            let data: Vec<T> = arr.iter().copied().collect();
            let value = OrtTensor::from_array((shape, data)).map_err(|e| {
                InferenceError::InvalidInput {
                    name: name.to_string(),
                    reason: e.to_string(),
                }
            })?;

            Ok((name, value.into()))
        })
        .collect()
}

/// Copy one native output, already borrowed as shape and flat data.
pub(crate) fn from_native<T: NativeElement>(name: &str, shape: Vec<usize>, data: &[T]) -> Result<Tensor> {
    ArrayD::from_shape_vec(IxDyn(&shape), data.to_vec())
        .map(T::wrap)
        .map_err(|e| InferenceError::OutputExtraction(format!("output tensor {name:?}: {e}")))
}

/// Check that every declared output was produced.
pub(crate) fn ensure_outputs(produced: &NamedTensors, contracts: &[TensorContract]) -> Result<()> {
    match contracts.iter().find(|c| !produced.contains_key(&c.name)) {
        Some(missing) => Err(InferenceError::OutputExtraction(format!(
            "model did not produce output {:?}",
            missing.name
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(name: &str, dtype: ElementType) -> TensorContract {
        TensorContract {
            name: name.to_string(),
            dtype,
            shape: vec![-1],
        }
    }

    #[test]
    fn test_to_native_missing_input() {
        let tensors = NamedTensors::new();
        let contracts = [contract("x", ElementType::Float32)];

        let err = to_native::<f32>(&tensors, &contracts).err().unwrap();
        assert!(matches!(err, InferenceError::MissingInput { ref name } if name == "x"));
    }

    #[test]
    fn test_to_native_type_mismatch() {
        let mut tensors = NamedTensors::new();
        tensors.insert("x".to_string(), Tensor::from_u8(vec![1, 2], vec![2]).unwrap());
        let contracts = [contract("x", ElementType::Float32)];

        match to_native::<f32>(&tensors, &contracts).err().unwrap() {
            InferenceError::TypeMismatch { name, expected, actual } => {
                assert_eq!(name, "x");
                assert_eq!(expected, ElementType::Float32);
                assert_eq!(actual, ElementType::Uint8);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_to_native_keeps_contract_order() {
        let mut tensors = NamedTensors::new();
        tensors.insert("b".to_string(), Tensor::from_u8(vec![1], vec![1]).unwrap());
        tensors.insert("a".to_string(), Tensor::from_u8(vec![2], vec![1]).unwrap());
        tensors.insert("unused".to_string(), Tensor::from_f32(vec![0.0], vec![1]).unwrap());
        let contracts = [contract("a", ElementType::Uint8), contract("b", ElementType::Uint8)];

        let values = to_native::<u8>(&tensors, &contracts).unwrap();
        let names: Vec<&str> = values.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_from_native_shape_mismatch() {
        let err = from_native::<f32>("y", vec![2, 2], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, InferenceError::OutputExtraction(_)));
    }

    #[test]
    fn test_ensure_outputs() {
        let mut produced = NamedTensors::new();
        produced.insert("y".to_string(), Tensor::from_f32(vec![1.0], vec![1]).unwrap());

        assert!(ensure_outputs(&produced, &[contract("y", ElementType::Float32)]).is_ok());
        assert!(ensure_outputs(&produced, &[contract("z", ElementType::Float32)]).is_err());
    }
}
