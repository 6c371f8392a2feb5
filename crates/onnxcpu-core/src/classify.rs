//! Ranking of classification outputs.

use onnxcpu_inference::Tensor;
use serde::Serialize;

/// One ranked class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassScore {
    pub index: usize,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// The `k` highest-scoring elements of a tensor, flattened, best first.
pub fn top_k(tensor: &Tensor, k: usize, labels: Option<&[String]>) -> Vec<ClassScore> {
    let scores: Vec<f32> = match tensor {
        Tensor::Float32(arr) => arr.iter().copied().collect(),
        Tensor::Uint8(arr) => arr.iter().map(|&v| f32::from(v)).collect(),
    };

    let mut ranked: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    ranked
        .into_iter()
        .take(k)
        .map(|(index, score)| ClassScore {
            index,
            score,
            label: labels.and_then(|l| l.get(index)).cloned(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_k_with_labels() {
        let tensor = Tensor::from_f32(vec![0.1, 0.7, 0.05, 0.15], vec![1, 4]).unwrap();
        let labels: Vec<String> = ["cat", "dog", "fox"].iter().map(|s| s.to_string()).collect();

        let top = top_k(&tensor, 2, Some(&labels));
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].index, 1);
        assert_eq!(top[0].label.as_deref(), Some("dog"));
        // index 3 has no label
        assert_eq!(top[1].index, 3);
        assert_eq!(top[1].label, None);
    }

    #[test]
    fn test_top_k_uint8() {
        let tensor = Tensor::from_u8(vec![3, 200, 9], vec![3]).unwrap();
        let top = top_k(&tensor, 10, None);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].score, 200.0);
    }
}
