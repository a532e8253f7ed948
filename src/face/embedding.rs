//! Face embedding vectors and similarity measures.

use serde::{Deserialize, Serialize};

/// An L2-normalised face embedding.
///
/// Normalisation happens on construction, so cosine similarity between two
/// embeddings is a plain dot product. A zero vector stays zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<f32>", into = "Vec<f32>")]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(mut values: Vec<f32>) -> Self {
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut values {
                *v /= norm;
            }
        }
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Cosine similarity in `[-1, 1]`. Mismatched dimensions compare as 0.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        cosine_similarity(&self.0, &other.0)
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

impl From<Embedding> for Vec<f32> {
    fn from(e: Embedding) -> Self {
        e.0
    }
}

/// Cosine similarity of two raw vectors. Zero-length or mismatched inputs give 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let nb = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

/// Convert the L2 distance between two unit vectors into cosine similarity.
pub fn similarity_from_l2(distance: f32) -> f32 {
    1.0 - (distance * distance) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_normalises() {
        let e = Embedding::new(vec![3.0, 4.0]);
        assert!((e.as_slice()[0] - 0.6).abs() < 1e-6);
        assert!((e.as_slice()[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_is_left_alone() {
        let e = Embedding::new(vec![0.0, 0.0, 0.0]);
        assert_eq!(e.as_slice(), &[0.0, 0.0, 0.0]);
        assert_eq!(e.similarity(&Embedding::new(vec![1.0, 0.0, 0.0])), 0.0);
    }

    #[test]
    fn orthogonal_and_opposite() {
        let x = Embedding::new(vec![1.0, 0.0]);
        let y = Embedding::new(vec![0.0, 2.0]);
        let neg = Embedding::new(vec![-5.0, 0.0]);
        assert!(x.similarity(&y).abs() < 1e-6);
        assert!((x.similarity(&neg) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn mismatched_dimensions_do_not_match() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn l2_distance_conversion_agrees_with_cosine() {
        let a = Embedding::new(vec![1.0, 2.0, 3.0]);
        let b = Embedding::new(vec![2.0, 1.0, 3.5]);
        let dist: f32 = a
            .as_slice()
            .iter()
            .zip(b.as_slice())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt();
        assert!((similarity_from_l2(dist) - a.similarity(&b)).abs() < 1e-5);
    }
}
