//! In-memory vector store over page chunks.
//!
//! A store is built once per document and is read-only afterwards. Building
//! tolerates per-chunk embedding failures; retrieval does not, because an
//! answer without grounding would be silently wrong.

use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chunking::{Chunker, ChunkerConfig};
use crate::core::Chunk;
use crate::embedding::{Embedder, cosine_similarity};
use crate::error::{ChunkingError, EmbeddingError};

/// Default number of chunks returned by [`VectorStore::retrieve`].
pub const DEFAULT_TOP_K: usize = 5;
/// Chunks whose trimmed text is shorter than this are not indexed.
pub const DEFAULT_MIN_CHUNK_CHARS: usize = 50;

/// Process-wide counter for chunk identifiers.
static NEXT_CHUNK_SEQ: AtomicU64 = AtomicU64::new(0);

fn next_chunk_id(page: u32) -> String {
    let seq = NEXT_CHUNK_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{page}-{seq}")
}

/// Indexing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    /// Window parameters for the chunker.
    pub chunker: ChunkerConfig,
    /// Minimum trimmed length for a chunk to be embedded.
    pub min_chunk_chars: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            min_chunk_chars: DEFAULT_MIN_CHUNK_CHARS,
        }
    }
}

/// Counters describing one indexing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Pages recovered from the text.
    pub pages: usize,
    /// Windows produced by the chunker.
    pub produced: usize,
    /// Windows discarded as too short.
    pub filtered: usize,
    /// Windows dropped because embedding failed.
    pub failed: usize,
    /// Chunks stored.
    pub indexed: usize,
}

/// A retrieved chunk with its similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    /// The stored chunk.
    pub chunk: Chunk,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
}

/// Ordered chunk records sharing one embedding space.
#[derive(Debug, Clone, Default)]
pub struct VectorStore {
    chunks: Vec<Chunk>,
    dimensions: Option<usize>,
}

impl VectorStore {
    /// Chunks the text, embeds each surviving window sequentially, and
    /// collects the ones that embedded successfully.
    ///
    /// Embedding failures and vectors whose length disagrees with the first
    /// accepted vector are logged and skipped. An empty result is valid.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkingError`] only for an invalid chunker configuration.
    pub async fn build(
        text: &str,
        embedder: &dyn Embedder,
        config: &IndexConfig,
    ) -> Result<(Self, IndexStats), ChunkingError> {
        let chunker = Chunker::new(config.chunker)?;
        let windows = chunker.chunk(text);

        let mut stats = IndexStats {
            pages: chunker.split_pages(text).len(),
            produced: windows.len(),
            ..IndexStats::default()
        };
        let mut store = Self::default();

        for window in windows {
            if window.text.trim().chars().count() < config.min_chunk_chars {
                stats.filtered += 1;
                continue;
            }

            let vector = match embedder.embed(&window.text).await {
                Ok(v) => v,
                Err(e) => {
                    warn!(page = window.page, error = %e, "failed to embed chunk, skipping");
                    stats.failed += 1;
                    continue;
                }
            };

            let chunk = Chunk {
                id: next_chunk_id(window.page),
                text: window.text,
                page_number: window.page,
                vector,
            };
            if let Err(reason) = store.push(chunk) {
                warn!(page = window.page, reason, "rejected embedded chunk");
                stats.failed += 1;
            }
        }

        stats.indexed = store.len();
        info!(
            embedder = embedder.name(),
            pages = stats.pages,
            produced = stats.produced,
            filtered = stats.filtered,
            failed = stats.failed,
            indexed = stats.indexed,
            "vector store built"
        );
        Ok((store, stats))
    }

    /// Builds a store from already-embedded chunks.
    ///
    /// Chunks with an empty vector or a mismatched dimensionality are dropped.
    #[must_use]
    pub fn from_chunks(chunks: impl IntoIterator<Item = Chunk>) -> Self {
        let mut store = Self::default();
        for chunk in chunks {
            if let Err(reason) = store.push(chunk) {
                warn!(reason, "rejected chunk");
            }
        }
        store
    }

    fn push(&mut self, chunk: Chunk) -> Result<(), &'static str> {
        if chunk.vector.is_empty() {
            return Err("empty vector");
        }
        match self.dimensions {
            Some(dims) if dims != chunk.vector.len() => return Err("dimension mismatch"),
            Some(_) => {}
            None => self.dimensions = Some(chunk.vector.len()),
        }
        self.chunks.push(chunk);
        Ok(())
    }

    /// Number of stored chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if the store holds no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Vector length shared by all chunks, if any are stored.
    #[must_use]
    pub const fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// Stored chunks in insertion order.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Ranks every chunk against the query and returns the best `top_k`,
    /// most similar first. Equal scores keep insertion order.
    ///
    /// An empty store returns immediately without embedding the query.
    ///
    /// # Errors
    ///
    /// Propagates the [`EmbeddingError`] if the query cannot be embedded.
    pub async fn retrieve(
        &self,
        query: &str,
        embedder: &dyn Embedder,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, EmbeddingError> {
        if self.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = embedder.embed(query).await?;
        Ok(self.rank(&query_vector, top_k))
    }

    /// Ranks chunks against an already-embedded query.
    #[must_use]
    pub fn rank(&self, query_vector: &[f32], top_k: usize) -> Vec<ScoredChunk> {
        let scores: Vec<f32> = self
            .chunks
            .par_iter()
            .map(|chunk| cosine_similarity(query_vector, &chunk.vector))
            .collect();

        let mut order: Vec<usize> = (0..self.chunks.len()).collect();
        // Stable: ties keep insertion order.
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
        order.truncate(top_k);

        debug!(
            candidates = self.chunks.len(),
            returned = order.len(),
            "ranked chunks"
        );

        order
            .into_iter()
            .map(|i| ScoredChunk {
                chunk: self.chunks[i].clone(),
                score: scores[i],
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Embedder that fails for texts containing "FAIL" and counts calls.
    struct FlakyEmbedder {
        calls: AtomicUsize,
        inner: HashEmbedder,
    }

    impl FlakyEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                inner: HashEmbedder::default(),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.contains("FAIL") {
                return Err(EmbeddingError::Request {
                    provider: "flaky",
                    message: "rate limited".to_string(),
                });
            }
            Ok(self.inner.embed_sync(text))
        }
    }

    fn chunk(page: u32, vector: Vec<f32>) -> Chunk {
        Chunk {
            id: next_chunk_id(page),
            text: format!("page {page}"),
            page_number: page,
            vector,
        }
    }

    fn long_page(n: u32, words: &str) -> String {
        format!("--- Page {n} ---\n{}\n", words.repeat(4))
    }

    #[tokio::test]
    async fn test_build_filters_short_and_failed_chunks() {
        let embedder = FlakyEmbedder::new();
        let text = format!(
            "{}{}--- Page 3 ---\ntiny\n",
            long_page(1, "the sky is blue and wide. "),
            long_page(2, "FAIL this page on purpose. "),
        );
        let (store, stats) = VectorStore::build(&text, &embedder, &IndexConfig::default())
            .await
            .unwrap_or_else(|e| panic!("build failed: {e}"));

        assert_eq!(stats.pages, 3);
        assert_eq!(stats.produced, 3);
        assert_eq!(stats.filtered, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.indexed, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.chunks()[0].page_number, 1);
        // the short page never reached the embedder
        assert_eq!(embedder.calls(), 2);
    }

    #[tokio::test]
    async fn test_build_empty_text_yields_empty_store() {
        let embedder = FlakyEmbedder::new();
        let (store, stats) = VectorStore::build("", &embedder, &IndexConfig::default())
            .await
            .unwrap_or_else(|e| panic!("build failed: {e}"));
        assert!(store.is_empty());
        assert_eq!(stats, IndexStats::default());
    }

    #[tokio::test]
    async fn test_build_rejects_bad_chunker_config() {
        let embedder = FlakyEmbedder::new();
        let config = IndexConfig {
            chunker: ChunkerConfig {
                chunk_size: 10,
                overlap: 20,
            },
            ..IndexConfig::default()
        };
        assert!(VectorStore::build("x", &embedder, &config).await.is_err());
    }

    #[tokio::test]
    async fn test_retrieve_empty_store_skips_embedding() {
        let embedder = FlakyEmbedder::new();
        let store = VectorStore::default();
        let results = store
            .retrieve("anything", &embedder, DEFAULT_TOP_K)
            .await
            .unwrap_or_else(|e| panic!("retrieve failed: {e}"));
        assert!(results.is_empty());
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_retrieve_propagates_query_failure() {
        let embedder = FlakyEmbedder::new();
        let store = VectorStore::from_chunks([chunk(1, vec![1.0, 0.0])]);
        let result = store.retrieve("FAIL", &embedder, 3).await;
        assert!(matches!(result, Err(EmbeddingError::Request { .. })));
    }

    #[test]
    fn test_rank_orders_descending_with_stable_ties() {
        let store = VectorStore::from_chunks([
            chunk(1, vec![0.0, 1.0]),
            chunk(2, vec![1.0, 0.0]),
            chunk(3, vec![1.0, 0.0]),
            chunk(4, vec![1.0, 1.0]),
        ]);
        let ranked = store.rank(&[1.0, 0.0], 10);
        let pages: Vec<u32> = ranked.iter().map(|r| r.chunk.page_number).collect();
        assert_eq!(pages, vec![2, 3, 4, 1]);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_rank_truncates_and_returns_all_when_small() {
        let store = VectorStore::from_chunks([chunk(1, vec![1.0]), chunk(2, vec![2.0])]);
        assert_eq!(store.rank(&[1.0], 1).len(), 1);
        assert_eq!(store.rank(&[1.0], 5).len(), 2);
    }

    #[test]
    fn test_zero_query_vector_scores_zero() {
        let store = VectorStore::from_chunks([chunk(1, vec![1.0, 2.0])]);
        let ranked = store.rank(&[0.0, 0.0], 1);
        assert!(ranked[0].score.abs() < f32::EPSILON);
    }

    #[test]
    fn test_from_chunks_enforces_dimensions() {
        let store = VectorStore::from_chunks([
            chunk(1, vec![1.0, 0.0]),
            chunk(2, vec![1.0]),
            chunk(3, Vec::new()),
        ]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.dimensions(), Some(2));
    }

    #[test]
    fn test_chunk_ids_unique() {
        let a = next_chunk_id(1);
        let b = next_chunk_id(1);
        assert_ne!(a, b);
        assert!(a.starts_with("1-"));
    }
}
