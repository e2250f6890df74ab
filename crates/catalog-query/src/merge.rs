//! Scoring, ordering and merging of candidate lists.

use std::collections::HashSet;

use catalog_core::{CatalogError, Product, Result};

/// A product paired with its distance to the query (lower is closer).
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub product: Product,
    pub distance: f32,
}

impl ScoredCandidate {
    pub fn new(product: Product, distance: f32) -> Self {
        Self { product, distance }
    }
}

/// Sum of squared elementwise differences.
pub fn squared_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(CatalogError::embedding(format!(
            "Cannot compare a {}-dimensional vector with a {}-dimensional one",
            a.len(),
            b.len()
        )));
    }
    Ok(a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum())
}

/// Drop every candidate whose product equals one of `seen`.
///
/// Equality is over the full product value, not the sku. Duplicates within
/// `candidates` itself are kept.
pub fn exclude_seen(candidates: Vec<ScoredCandidate>, seen: &[Product]) -> Vec<ScoredCandidate> {
    let seen: HashSet<&Product> = seen.iter().collect();
    candidates
        .into_iter()
        .filter(|c| !seen.contains(&c.product))
        .collect()
}

/// Order available products first, then by ascending distance.
///
/// The sort is stable, so candidates with equal keys keep their input order.
pub fn rank_candidates(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        (!a.product.available)
            .cmp(&!b.product.available)
            .then_with(|| a.distance.total_cmp(&b.distance))
    });
}

/// Concatenate the ranked lists (direct block first), keep the first
/// `limit`, then move available products ahead of unavailable ones without
/// otherwise reordering.
pub fn merge_ranked(
    direct: Vec<ScoredCandidate>,
    embedding: Vec<ScoredCandidate>,
    limit: usize,
) -> Vec<Product> {
    let mut merged: Vec<Product> = direct
        .into_iter()
        .chain(embedding)
        .take(limit)
        .map(|c| c.product)
        .collect();

    merged.sort_by_key(|p| !p.available);
    merged
}
