//! catalog-query - Hybrid product ranking
//!
//! Combines two candidate lists drawn from the same record store:
//!
//! - direct matches, where the query appears in a product's name or
//!   description or equals one of its tags
//! - recommendations, the nearest products in embedding space
//!
//! Direct matches always precede recommendations. Inside each block,
//! available products come before unavailable ones, then closer before
//! farther.
//!
//! # Example
//!
//! ```rust,ignore
//! use catalog_query::HybridRanker;
//! use std::sync::Arc;
//!
//! let ranker = HybridRanker::new(Arc::new(store), Arc::new(embedder));
//! let results = ranker.search("oat milk latte", false).await?;
//! ```

mod engine;
pub mod merge;

pub use engine::{HybridRanker, RankerConfig};

// Re-export for convenience
pub use catalog_core::{SearchNotice, SearchResults};
