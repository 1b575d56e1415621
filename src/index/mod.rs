//! In-memory search index: per-item metadata plus one contiguous buffer of
//! quantized embedding vectors.
//!
//! Item ids are implicit: an item's id is its zero-based position in the
//! metadata sequence, and its embedding occupies the matching fixed-width
//! slot of the buffer. The metadata resources redundantly carry an `id`
//! field; it is deliberately not modeled so it can never drift from position.


use serde::Deserialize;
use tracing::debug;

use crate::{Result, SemquoteError};

/// Embedding width used by every shipped collection.
pub const DEFAULT_EMBEDDING_DIM: usize = 1024;

/// One quote with provenance and optional publication-year enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuoteMetadata {
    pub quote: String,
    pub author: String,
    pub book_title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub era: Option<String>,
}

/// One scripture verse with its source reference.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerseMetadata {
    pub text: String,
    pub book: String,
    pub chapter: String,
    pub verse: String,
    pub source: String,
}

/// An immutable, fully-loaded collection: metadata in id order and the
/// concatenated int8 embedding buffer.
#[derive(Debug)]
pub struct SearchIndex<T> {
    metadata: Vec<T>,
    embeddings: Vec<i8>,
    embedding_dim: usize,
}

impl<T> SearchIndex<T> {
    /// Assembles an index from metadata and one or more embedding byte
    /// chunks.
    ///
    /// Chunks are concatenated in the order given; that order must match the
    /// order the producer split them in and is not (and cannot be) validated
    /// here. Fails with [`SemquoteError::SizeMismatch`] unless the assembled
    /// buffer holds exactly one `embedding_dim`-wide vector per item.
    #[inline]
    pub fn assemble(
        metadata: Vec<T>,
        embedding_chunks: Vec<Vec<u8>>,
        embedding_dim: usize,
    ) -> Result<Self> {
        let total_len: usize = embedding_chunks.iter().map(Vec::len).sum();
        let expected = metadata.len() * embedding_dim;
        if total_len != expected {
            return Err(SemquoteError::SizeMismatch {
                expected,
                actual: total_len,
            });
        }

        let mut embeddings = Vec::with_capacity(total_len);
        for chunk in &embedding_chunks {
            embeddings.extend(chunk.iter().map(|&b| b as i8));
        }

        debug!(
            "Assembled index: {} items, dim {}, {} chunk(s)",
            metadata.len(),
            embedding_dim,
            embedding_chunks.len()
        );

        Ok(Self {
            metadata,
            embeddings,
            embedding_dim,
        })
    }

    /// Number of items in the collection.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Width of every embedding vector in this collection.
    #[inline]
    #[must_use]
    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Non-owning view of the embedding vector for `id`.
    ///
    /// # Panics
    /// Panics if `id >= self.len()`. Callers validate ids through
    /// [`SearchIndex::metadata_of`] first; internal iteration only produces
    /// in-range ids.
    #[inline]
    #[must_use]
    pub fn embedding_of(&self, id: usize) -> &[i8] {
        let start = id * self.embedding_dim;
        &self.embeddings[start..start + self.embedding_dim]
    }

    /// Metadata for `id`, or `None` when the id is out of range.
    #[inline]
    #[must_use]
    pub fn metadata_of(&self, id: usize) -> Option<&T> {
        self.metadata.get(id)
    }
}
