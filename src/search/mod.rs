//! Brute-force similarity search over a loaded [`SearchIndex`].
//!
//! Every query scans the full collection: O(items x dim) per call. At the
//! corpus sizes this crate targets (thousands to tens of thousands of short
//! texts) an exhaustive scan beats maintaining an approximate index, so no
//! search structure is built or reused between calls.


use std::collections::HashSet;

use rand::Rng;
use tracing::debug;

use crate::index::SearchIndex;
use crate::quantization::QUANTIZATION_SCALE;
use crate::{Result, SemquoteError};

/// A ranked hit: the item's id, its similarity to the query, and a reference
/// to its metadata. Constructed fresh per query, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult<'a, T> {
    pub id: usize,
    pub score: f32,
    pub metadata: &'a T,
}

/// Similarity between two quantized vectors.
///
/// The raw int8 dot product is divided by 127^2 to undo both vectors'
/// quantization scale, approximating the cosine similarity of the original
/// unit vectors. The result is not clamped, so self-similarity can land a
/// hair above 1.0.
#[inline]
#[must_use]
pub fn score(a: &[i8], b: &[i8]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must share a dimension");
    let dot: i32 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| i32::from(x) * i32::from(y))
        .sum();
    dot as f32 / (QUANTIZATION_SCALE * QUANTIZATION_SCALE)
}

/// Finds the `top_k` items most similar to an arbitrary query vector.
///
/// Results are ordered by descending score; equal scores break ties by
/// ascending id, so the ordering is total and deterministic. `top_k = 0`
/// yields an empty result; a `top_k` larger than the candidate count yields
/// every candidate.
#[inline]
#[must_use]
pub fn search_by_vector<'a, T>(
    index: &'a SearchIndex<T>,
    query: &[i8],
    top_k: usize,
    exclude_ids: &HashSet<usize>,
) -> Vec<SearchResult<'a, T>> {
    let mut scored: Vec<(usize, f32)> = (0..index.len())
        .filter(|id| !exclude_ids.contains(id))
        .map(|id| (id, score(query, index.embedding_of(id))))
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.truncate(top_k);

    debug!("Scored {} candidates, returning {}", index.len(), scored.len());

    scored
        .into_iter()
        .map(|(id, score)| SearchResult {
            id,
            score,
            metadata: index
                .metadata_of(id)
                .expect("scored ids come from index iteration"),
        })
        .collect()
}

/// Finds the items most similar to an existing item, using its own embedding
/// as the query.
///
/// The item itself is excluded from the results unless `include_self` is set.
/// Fails with [`SemquoteError::NotFound`] when `id` is out of range.
#[inline]
pub fn search_by_id<T>(
    index: &SearchIndex<T>,
    id: usize,
    top_k: usize,
    include_self: bool,
) -> Result<Vec<SearchResult<'_, T>>> {
    if index.metadata_of(id).is_none() {
        return Err(SemquoteError::NotFound(id));
    }

    let exclude_ids = if include_self {
        HashSet::new()
    } else {
        HashSet::from([id])
    };
    Ok(search_by_vector(
        index,
        index.embedding_of(id),
        top_k,
        &exclude_ids,
    ))
}

/// Picks a uniformly random item.
///
/// # Panics
/// Panics on an empty index. An empty collection cannot pass assembly with a
/// non-trivial embedding buffer, so this is a caller bug, not a load state.
#[inline]
#[must_use]
pub fn random_item<T>(index: &SearchIndex<T>) -> (usize, &T) {
    assert!(!index.is_empty(), "random_item requires a non-empty index");
    let id = rand::rng().random_range(0..index.len());
    let metadata = index
        .metadata_of(id)
        .expect("random id is within bounds");
    (id, metadata)
}

/// Dense pairwise similarity matrix for an explicit set of items, including
/// self-pairs (which approximate, but do not exactly equal, 1.0).
///
/// # Panics
/// Panics if any id is out of range; callers validate first.
#[inline]
#[must_use]
pub fn pairwise_similarities<T>(index: &SearchIndex<T>, ids: &[usize]) -> Vec<Vec<f32>> {
    let embeddings: Vec<&[i8]> = ids.iter().map(|&id| index.embedding_of(id)).collect();
    embeddings
        .iter()
        .map(|&a| embeddings.iter().map(|&b| score(a, b)).collect())
        .collect()
}
