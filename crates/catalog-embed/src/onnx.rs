//! ONNX-based embedding model implementation.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ndarray::ArrayViewD;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use catalog_core::{CatalogError, Embedder, EmbeddingConfig, Result};

/// ONNX-based sentence embedder.
///
/// Product texts and queries go through the same model with no prefixes, so
/// that distances between a query vector and a product vector are comparable
/// with the distances the record store computes.
pub struct OnnxEmbedder {
    /// ONNX inference session (wrapped in Mutex for interior mutability).
    session: Mutex<Session>,

    /// Tokenizer for the model.
    tokenizer: Arc<Tokenizer>,

    /// Embedding dimension.
    dimension: usize,

    /// Maximum token count.
    max_tokens: usize,
}

impl OnnxEmbedder {
    /// Load the model and tokenizer named in the embedding configuration.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        Self::new(
            &config.model_path,
            &config.tokenizer_path,
            config.dimension,
            config.max_tokens,
            config.num_threads,
        )
    }

    /// Create a new embedder from model and tokenizer paths.
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `tokenizer_path` - Path to the tokenizer.json file
    /// * `dimension` - Width of the vectors the model produces
    /// * `max_tokens` - Inputs are truncated to this many tokens
    /// * `num_threads` - Intra-op threads for CPU inference
    pub fn new(
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
        dimension: usize,
        max_tokens: usize,
        num_threads: usize,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        let tokenizer_path = tokenizer_path.as_ref();

        info!("Loading ONNX model from {:?}", model_path);

        let session = Session::builder()
            .map_err(|e| unavailable(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| unavailable(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(num_threads)
            .map_err(|e| unavailable(format!("Failed to set thread count: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| unavailable(format!("Failed to load model: {}", e)))?;

        info!("Loading tokenizer from {:?}", tokenizer_path);

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| unavailable(format!("Failed to load tokenizer: {}", e)))?;

        info!("Embedder initialized: dim={}, max_tokens={}", dimension, max_tokens);

        Ok(Self {
            session: Mutex::new(session),
            tokenizer: Arc::new(tokenizer),
            dimension,
            max_tokens,
        })
    }

    fn run_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| CatalogError::embedding(format!("Tokenization failed: {}", e)))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.max_tokens);

        let batch_size = encodings.len();

        debug!("Embedding batch: size={}, max_len={}", batch_size, max_len);

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let len = ids.len().min(max_len);

            for j in 0..len {
                input_ids[i * max_len + j] = ids[j] as i64;
                attention_mask[i * max_len + j] = mask[j] as i64;
            }
        }

        let input_ids_tensor = Tensor::from_array((vec![batch_size, max_len], input_ids))
            .map_err(|e| CatalogError::embedding(format!("Failed to create input tensor: {}", e)))?;

        let attention_mask_tensor =
            Tensor::from_array((vec![batch_size, max_len], attention_mask)).map_err(|e| {
                CatalogError::embedding(format!("Failed to create mask tensor: {}", e))
            })?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| CatalogError::embedding(format!("Failed to lock session: {}", e)))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            ])
            .map_err(|e| CatalogError::embedding(format!("Inference failed: {}", e)))?;

        // Output names differ between exported models; take the first.
        let (_, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| CatalogError::embedding("No output tensor found"))?;

        let view = output
            .try_extract_array::<f32>()
            .map_err(|e| CatalogError::embedding(format!("Failed to extract tensor: {}", e)))?;

        let shape_dims: Vec<usize> = view.shape().to_vec();
        debug!("Output shape: {:?}", shape_dims);

        let embeddings = match shape_dims.len() {
            // (batch_size, seq_len, hidden_dim)
            3 => mean_pool(&view, &encodings, max_len),
            // (batch_size, hidden_dim), already pooled
            2 => (0..batch_size)
                .map(|i| l2_normalize((0..shape_dims[1]).map(|j| view[[i, j]]).collect()))
                .collect(),
            _ => {
                return Err(CatalogError::embedding(format!(
                    "Unexpected output shape: {:?}",
                    shape_dims
                )))
            }
        };

        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimension) {
            return Err(CatalogError::embedding(format!(
                "Model produced {} dimensions, configured for {}",
                bad.len(),
                self.dimension
            )));
        }

        Ok(embeddings)
    }
}

/// Mean pooling over the sequence dimension, honoring the attention mask.
fn mean_pool(
    tensor: &ArrayViewD<'_, f32>,
    encodings: &[tokenizers::Encoding],
    max_len: usize,
) -> Vec<Vec<f32>> {
    let shape = tensor.shape();
    let seq_len = shape[1];
    let hidden_dim = shape[2];

    encodings
        .iter()
        .enumerate()
        .map(|(i, encoding)| {
            let attention_mask = encoding.get_attention_mask();
            let limit = max_len.min(seq_len).min(attention_mask.len());

            let mut sum = vec![0.0f32; hidden_dim];
            let mut valid = 0usize;
            for j in 0..limit {
                if attention_mask[j] == 1 {
                    valid += 1;
                    for (k, slot) in sum.iter_mut().enumerate() {
                        *slot += tensor[[i, j, k]];
                    }
                }
            }

            if valid == 0 {
                return sum;
            }

            l2_normalize(sum.into_iter().map(|s| s / valid as f32).collect())
        })
        .collect()
}

/// L2 normalize a vector.
pub(crate) fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

fn unavailable(message: String) -> CatalogError {
    CatalogError::unavailable("onnx embedder", message)
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        // Session is not Send; inference runs inline.
        self.run_batch(texts)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
