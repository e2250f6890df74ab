//! Hybrid ranker combining direct matches with embedding recommendations.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use catalog_core::{
    Embedder, Metadata, Product, RecordStore, Result, SearchConfig, SearchNotice, SearchResults,
    MAX_RESULTS_LIMIT,
};

use crate::merge::{exclude_seen, merge_ranked, rank_candidates, squared_distance, ScoredCandidate};

/// Limits applied while ranking.
#[derive(Debug, Clone)]
pub struct RankerConfig {
    /// Nearest-neighbor candidates requested from the store.
    pub embedding_candidates: usize,

    /// Maximum number of products returned, never above
    /// [`MAX_RESULTS_LIMIT`].
    pub max_results: usize,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            embedding_candidates: 100,
            max_results: MAX_RESULTS_LIMIT,
        }
    }
}

impl From<&SearchConfig> for RankerConfig {
    fn from(config: &SearchConfig) -> Self {
        Self {
            embedding_candidates: config.embedding_candidates,
            max_results: config.max_results.min(MAX_RESULTS_LIMIT),
        }
    }
}

/// Hybrid product ranker.
///
/// Direct matches (the query appears in the name, description or a tag) are
/// always listed before embedding recommendations. Inside each block,
/// available products come first, then closer ones.
pub struct HybridRanker<S: ?Sized, E: ?Sized> {
    /// Record store queried for both candidate lists.
    store: Arc<S>,

    /// Embedding model used to score direct matches.
    embedder: Arc<E>,

    config: RankerConfig,
}

impl<S, E> HybridRanker<S, E>
where
    S: RecordStore + ?Sized,
    E: Embedder + ?Sized,
{
    /// Create a ranker with default limits.
    pub fn new(store: Arc<S>, embedder: Arc<E>) -> Self {
        Self::with_config(store, embedder, RankerConfig::default())
    }

    /// Create a ranker with explicit limits. `max_results` is capped at
    /// [`MAX_RESULTS_LIMIT`].
    pub fn with_config(store: Arc<S>, embedder: Arc<E>, mut config: RankerConfig) -> Self {
        config.max_results = config.max_results.min(MAX_RESULTS_LIMIT);
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Limits in effect.
    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Rank products for a query.
    ///
    /// Any failure from the store or the embedder, including a stale
    /// collection or an undecodable record, is returned as is.
    pub async fn rank(&self, query: &str, exact_only: bool) -> Result<Vec<Product>> {
        let needle = query.to_lowercase();

        let (embedding_hits, direct_hits) = tokio::join!(
            self.embedding_hits(query, exact_only),
            self.store.containment_filter(&needle)
        );
        let embedding_hits = embedding_hits?;
        let direct_hits = direct_hits?;

        debug!(
            "Candidates: {} embedding, {} containing {:?}",
            embedding_hits.len(),
            direct_hits.len(),
            needle
        );

        // Decode everything before ranking; one bad record fails the query.
        let embedding = embedding_hits
            .iter()
            .map(|(metadata, distance)| {
                Ok(ScoredCandidate::new(Product::from_metadata(metadata)?, *distance))
            })
            .collect::<Result<Vec<_>>>()?;
        let direct = direct_hits
            .iter()
            .map(Product::from_metadata)
            .collect::<Result<Vec<_>>>()?;

        // Containment also hits partial tags and text spanning the field
        // separators, so re-check against the product fields.
        let direct: Vec<Product> = direct.into_iter().filter(|p| p.matches(query)).collect();
        let mut embedding = exclude_seen(embedding, &direct);
        let mut direct = self.score_direct(query, direct).await?;

        rank_candidates(&mut direct);
        rank_candidates(&mut embedding);

        let ranked = merge_ranked(direct, embedding, self.config.max_results);
        debug!("Ranked {} products for {:?}", ranked.len(), query);
        Ok(ranked)
    }

    /// Rank products and wrap them with timing information.
    ///
    /// A stale collection or a malformed record yields an empty result with a
    /// notice instead of an error. Other failures are returned.
    pub async fn search(&self, query: &str, exact_only: bool) -> Result<SearchResults> {
        let start = Instant::now();

        info!("Searching for: {:?} (exact_only={})", query, exact_only);

        let (products, notice) = match self.rank(query, exact_only).await {
            Ok(products) => (products, None),
            Err(e) if e.is_stale() => {
                warn!("Product index changed underneath this process: {}", e);
                let message = "The product database changed, restart to search it".to_string();
                (Vec::new(), Some(SearchNotice::IndexStale { message }))
            }
            Err(e) if e.is_malformed() => {
                warn!("Malformed product data in query results: {}", e);
                (
                    Vec::new(),
                    Some(SearchNotice::MalformedData {
                        message: e.to_string(),
                    }),
                )
            }
            Err(e) => return Err(e),
        };

        let latency_ms = start.elapsed().as_millis() as u64;

        info!("Search completed: {} results in {}ms", products.len(), latency_ms);

        Ok(SearchResults {
            query: query.to_string(),
            exact_only,
            total_results: products.len(),
            latency_ms,
            products,
            notice,
        })
    }

    async fn embedding_hits(&self, query: &str, exact_only: bool) -> Result<Vec<(Metadata, f32)>> {
        if exact_only {
            return Ok(Vec::new());
        }
        self.store
            .nearest_neighbors(query, self.config.embedding_candidates)
            .await
    }

    /// Distance of each direct match to the query. The query is embedded
    /// only when there is something to score.
    async fn score_direct(&self, query: &str, direct: Vec<Product>) -> Result<Vec<ScoredCandidate>> {
        if direct.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;
        let texts: Vec<String> = direct.iter().map(Product::searchable_text).collect();
        let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let vectors = self.embedder.embed_batch(&text_refs).await?;

        direct
            .into_iter()
            .zip(vectors)
            .map(|(product, vector)| {
                let distance = squared_distance(&query_vector, &vector)?;
                Ok(ScoredCandidate::new(product, distance))
            })
            .collect()
    }
}
