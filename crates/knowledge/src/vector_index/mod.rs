//! In-memory vector index with brute-force cosine search.
//!
//! Records are chunks paired with their embeddings, stored row-major in one
//! flat buffer. The index remembers the embedding space it was built in and
//! refuses vectors from any other.

mod persist;

pub use persist::{read_manifest, remove_persisted, Manifest, DATABASE_FILE, FORMAT_VERSION};

use crate::chunk::Chunk;
use crate::embeddings::{embed_texts, BoundProvider, EmbeddingSpace};
use lexora_core::{AppError, AppResult};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Default number of chunks returned by a search.
pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    space: EmbeddingSpace,
    records: Vec<Chunk>,
    /// `records.len() * space.dimensions` values
    vectors: Vec<f32>,
}

impl VectorIndex {
    /// An index with no records in the embedder's space.
    pub fn empty(space: EmbeddingSpace) -> Self {
        Self {
            space,
            records: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// Embed every chunk and build a fresh index.
    ///
    /// # Errors
    /// `Embedding` if the provider fails; nothing is built.
    pub async fn create(embedder: &BoundProvider, chunks: Vec<Chunk>) -> AppResult<Self> {
        let mut index = Self::empty(embedder.provider.space());
        index.add(embedder, chunks).await?;
        Ok(index)
    }

    /// Embed new chunks and append them. Existing vectors are not touched,
    /// and on failure the index is left exactly as it was.
    ///
    /// Returns the number of records added.
    pub async fn add(&mut self, embedder: &BoundProvider, chunks: Vec<Chunk>) -> AppResult<usize> {
        self.space
            .validate_consistency(&embedder.provider.space())?;

        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embed_texts(embedder.provider.as_ref(), &texts, embedder.batch_size).await?;

        let added = chunks.len();
        self.vectors.reserve(added * self.space.dimensions);
        for vector in &vectors {
            self.vectors.extend_from_slice(vector);
        }
        self.records.extend(chunks);

        tracing::debug!(added, total = self.records.len(), "Appended records to index");
        Ok(added)
    }

    /// The `k` records most similar to `query`, closest first.
    ///
    /// An empty index returns no results without calling the provider.
    pub async fn search(
        &self,
        embedder: &BoundProvider,
        query: &str,
        k: usize,
    ) -> AppResult<Vec<(Chunk, f32)>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = embedder.provider.embed(query).await?;
        if query_vector.len() != self.space.dimensions {
            return Err(AppError::Embedding(format!(
                "Query embedding has {} dimensions, index expects {}",
                query_vector.len(),
                self.space.dimensions
            )));
        }

        Ok(self.search_by_vector(&query_vector, k))
    }

    /// Rank by cosine similarity. Ties keep insertion order.
    pub fn search_by_vector(&self, query: &[f32], k: usize) -> Vec<(Chunk, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .rows()
            .enumerate()
            .map(|(i, row)| (i, cosine_similarity(query, row)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        scored
            .into_iter()
            .take(k)
            .map(|(i, score)| (self.records[i].clone(), score))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn embedding_space(&self) -> &EmbeddingSpace {
        &self.space
    }

    pub fn records(&self) -> &[Chunk] {
        &self.records
    }

    /// Distinct source documents with at least one record.
    pub fn sources(&self) -> BTreeSet<String> {
        self.records.iter().map(|c| c.source.clone()).collect()
    }

    pub fn contains_source(&self, source: &str) -> bool {
        self.records.iter().any(|c| c.source == source)
    }

    /// Drop records past `len`; used to undo an append that could not be persisted.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.records.truncate(len);
        self.vectors.truncate(len * self.space.dimensions);
    }

    fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.vectors.chunks_exact(self.space.dimensions.max(1))
    }

    /// Reassemble an index from persisted parts, checking they agree.
    pub(crate) fn from_parts(
        space: EmbeddingSpace,
        records: Vec<Chunk>,
        vectors: Vec<f32>,
    ) -> Result<Self, String> {
        if space.dimensions == 0 {
            return Err("embedding space has zero dimensions".to_string());
        }
        if vectors.len() != records.len() * space.dimensions {
            return Err(format!(
                "{} vector values do not match {} records of {} dimensions",
                vectors.len(),
                records.len(),
                space.dimensions
            ));
        }
        Ok(Self {
            space,
            records,
            vectors,
        })
    }
}

/// Calculate cosine similarity between two vectors. Zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
