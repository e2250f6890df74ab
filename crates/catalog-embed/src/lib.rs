//! catalog-embed - Embedding providers
//!
//! This crate provides the [`Embedder`] implementations used to index
//! products and embed search queries.
//!
//! # Providers
//!
//! - [`OnnxEmbedder`]: ONNX Runtime sentence embedding model with mean
//!   pooling and L2 normalization.
//! - [`MockEmbedder`]: deterministic hash-based vectors for tests and for
//!   running without model files.

mod mock;
mod onnx;

use std::sync::Arc;

pub use mock::MockEmbedder;
pub use onnx::OnnxEmbedder;

// Re-export the Embedder trait for convenience
pub use catalog_core::Embedder;

use catalog_core::{EmbeddingBackend, EmbeddingConfig, Result};

/// Build the embedder selected by the configuration.
pub fn from_config(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    Ok(match config.backend {
        EmbeddingBackend::Mock => Arc::new(MockEmbedder::with_dimension(config.dimension)),
        EmbeddingBackend::Onnx => Arc::new(OnnxEmbedder::from_config(config)?),
    })
}
