//! Deterministic token-hashing embedder.
//!
//! Each lowercase alphanumeric token is hashed with SHA-256 into one of
//! `dimensions` buckets with a hash-derived sign. Texts that share words end
//! up with positively correlated vectors, which is enough for offline runs
//! and tests that must never touch the network.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::Embedder;
use crate::error::EmbeddingError;

/// Default vector length for [`HashEmbedder`].
pub const DEFAULT_HASH_DIMENSIONS: usize = 256;

/// Offline embedder based on hashed token counts.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Creates an embedder producing vectors of the given length.
    ///
    /// A length of zero is raised to one.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Vector length produced by this embedder.
    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Computes the vector synchronously.
    #[must_use]
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);

        for token in tokens {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = u64::from_le_bytes(bucket_bytes);
            // usize is at least 32 bits on supported targets; the modulo keeps
            // the index in range either way.
            let index = usize::try_from(bucket % self.dimensions as u64).unwrap_or(0);
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }

        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &'static str {
        "hash"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_sync(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[test]
    fn test_fixed_dimensions() {
        let embedder = HashEmbedder::new(64);
        assert_eq!(embedder.embed_sync("hello world").len(), 64);
        assert_eq!(embedder.embed_sync("").len(), 64);
        assert_eq!(HashEmbedder::new(0).dimensions(), 1);
    }

    #[test]
    fn test_deterministic_and_case_insensitive() {
        let embedder = HashEmbedder::default();
        assert_eq!(
            embedder.embed_sync("The Sky is Blue"),
            embedder.embed_sync("the sky is blue")
        );
    }

    #[test]
    fn test_shared_words_score_higher() {
        let embedder = HashEmbedder::default();
        let query = embedder.embed_sync("what color is the sky");
        let related = embedder.embed_sync("the sky is blue");
        let unrelated = embedder.embed_sync("water boils at 100c");
        assert!(
            cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated),
            "related text should rank above unrelated text"
        );
    }

    #[tokio::test]
    async fn test_async_embed_matches_sync() {
        let embedder = HashEmbedder::default();
        let v = embedder
            .embed("page one")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(v, embedder.embed_sync("page one"));
    }
}
