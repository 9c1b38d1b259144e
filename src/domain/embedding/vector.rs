//! Embedding vectors and cosine similarity

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// An immutable embedding vector
///
/// Embeddings are compared only through [`cosine_similarity`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Embedding {
    values: Vec<f32>,
}

impl Embedding {
    /// Create an embedding, rejecting empty or non-finite vectors
    pub fn new(values: Vec<f32>) -> Result<Self, DomainError> {
        if values.is_empty() {
            return Err(DomainError::invalid_embedding("embedding is empty"));
        }

        if let Some(position) = values.iter().position(|v| !v.is_finite()) {
            return Err(DomainError::invalid_embedding(format!(
                "non-finite value at position {}",
                position
            )));
        }

        Ok(Self { values })
    }

    /// Get the number of dimensions
    pub fn dimensions(&self) -> usize {
        self.values.len()
    }

    /// Get the raw values
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Cosine similarity with another embedding
    pub fn cosine_similarity(&self, other: &Embedding) -> Result<f32, DomainError> {
        cosine_similarity(&self.values, &other.values)
    }
}

impl TryFrom<Vec<f32>> for Embedding {
    type Error = DomainError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<Embedding> for Vec<f32> {
    fn from(embedding: Embedding) -> Self {
        embedding.values
    }
}

/// Calculate cosine similarity between two vectors
///
/// Mismatched dimensions are an `InvalidEmbedding` error. A zero vector has
/// similarity 0.0 with everything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, DomainError> {
    if a.len() != b.len() {
        return Err(DomainError::invalid_embedding(format!(
            "dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    if a.is_empty() {
        return Err(DomainError::invalid_embedding("embedding is empty"));
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_vectors() {
        let similarity = cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!((similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_orthogonal_vectors() {
        let similarity = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(similarity.abs() < 1e-6);
    }

    #[test]
    fn test_opposite_vectors() {
        let similarity = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap();
        assert!((similarity + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_exact_value() {
        // 19 / 20 with both norms exactly representable
        let a = [1.0, 0.0, 0.0, 0.0, 0.0];
        let b = [19.0, 6.0, 1.0, 1.0, 1.0];

        assert_eq!(cosine_similarity(&a, &b).unwrap(), 0.95);
    }

    #[test]
    fn test_zero_vector() {
        let similarity = cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
        assert_eq!(similarity, 0.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]).unwrap_err();
        assert!(err.is_invalid_embedding());
    }

    #[test]
    fn test_embedding_rejects_empty() {
        assert!(Embedding::new(vec![]).unwrap_err().is_invalid_embedding());
    }

    #[test]
    fn test_embedding_rejects_nan() {
        let err = Embedding::new(vec![1.0, f32::NAN]).unwrap_err();
        assert!(err.to_string().contains("position 1"));
    }

    #[test]
    fn test_embedding_serde_roundtrip_validates() {
        let embedding: Embedding = serde_json::from_str("[0.5, 0.5]").unwrap();
        assert_eq!(embedding.dimensions(), 2);

        let json = serde_json::to_string(&embedding).unwrap();
        assert_eq!(json, "[0.5,0.5]");

        assert!(serde_json::from_str::<Embedding>("[]").is_err());
    }
}
