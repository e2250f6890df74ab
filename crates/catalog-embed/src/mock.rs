//! Deterministic embedder that needs no model files.

use async_trait::async_trait;

use catalog_core::{Embedder, Result};

use crate::onnx::l2_normalize;

/// A mock embedder for tests and model-less setups.
///
/// Vectors are derived from a hash of the text, so identical input always
/// produces the identical vector.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    /// Create a new mock embedder with default settings.
    pub fn new() -> Self {
        Self { dimension: 768 }
    }

    /// Create a mock embedder with a custom dimension.
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let hash = text
            .bytes()
            .fold(17u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let embedding = (0..self.dimension)
            .map(|i| ((hash.wrapping_mul(i as u64 + 1) % 1000) as f32) / 1000.0 - 0.5)
            .collect();
        l2_normalize(embedding)
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.vector(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
