//! Core traits defining the interfaces between components.

use async_trait::async_trait;

use crate::error::{CatalogError, Result};
use crate::types::{Metadata, StoredRecord};

/// Embedding model trait.
///
/// Implementations must be deterministic for identical input and always
/// return vectors of [`Embedder::dimension`] length.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::embedding("No embedding returned"))
    }

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;
}

/// Query capabilities the ranking engine needs from a record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Nearest stored records to the embedded query text, closest first,
    /// each with its distance.
    async fn nearest_neighbors(&self, query_text: &str, limit: usize)
        -> Result<Vec<(Metadata, f32)>>;

    /// Every record whose indexed text contains `needle`.
    async fn containment_filter(&self, needle: &str) -> Result<Vec<Metadata>>;
}

/// A record store that can also be written and inspected.
#[async_trait]
pub trait CatalogStore: RecordStore {
    /// Insert new records. Fails if any id is already stored.
    async fn add(&self, records: &[StoredRecord]) -> Result<()>;

    /// Insert or replace records by id.
    async fn upsert(&self, records: &[StoredRecord]) -> Result<()>;

    /// Drop every record by recreating the collection.
    async fn clear(&self) -> Result<()>;

    /// Metadata of the first `limit` records.
    async fn peek(&self, limit: usize) -> Result<Vec<Metadata>>;

    /// Number of stored records.
    async fn count(&self) -> Result<u64>;
}
