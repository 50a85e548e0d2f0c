//! Embedding provider abstraction and vector math.
//!
//! The [`Embedder`] trait is the only way the rest of the crate turns text
//! into vectors. Indexing and query embedding go through the same instance so
//! both live in one embedding space.

mod gemini;
mod hash;
mod openai;

#[cfg(feature = "fastembed-embeddings")]
mod local;

use async_trait::async_trait;

use crate::agent::config::AgentConfig;
use crate::error::EmbeddingError;

pub use gemini::{DEFAULT_GEMINI_BASE_URL, GeminiEmbedder};
pub use hash::HashEmbedder;
#[cfg(feature = "fastembed-embeddings")]
pub use local::FastEmbedder;
pub use openai::OpenAiEmbedder;

/// Trait for embedding backends.
///
/// Every vector returned by one embedder has the same length.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Short backend name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Embeds a single text.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError`] if the backend fails or returns no vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Creates the embedder selected by [`AgentConfig::embedder`].
///
/// # Supported Embedders
///
/// - `"hash"`: offline token-hashing vectors, no network
/// - `"gemini"`: Google `text-embedding-004` (default model)
/// - `"openai"`: `OpenAI`-compatible embeddings API
/// - `"fastembed"`: local ONNX model (requires `fastembed-embeddings`)
///
/// # Errors
///
/// Returns [`EmbeddingError::Unsupported`] for unknown names and
/// [`EmbeddingError::ApiKeyMissing`] when a remote backend has no key.
pub fn create_embedder(config: &AgentConfig) -> Result<Box<dyn Embedder>, EmbeddingError> {
    match config.embedder.as_str() {
        "hash" => Ok(Box::new(HashEmbedder::default())),
        "gemini" => {
            let key = config
                .api_key
                .clone()
                .ok_or(EmbeddingError::ApiKeyMissing { provider: "gemini" })?;
            Ok(Box::new(GeminiEmbedder::new(
                key,
                config.base_url.clone(),
                config.embedding_model.clone(),
            )))
        }
        "openai" => {
            let key = config
                .api_key
                .clone()
                .ok_or(EmbeddingError::ApiKeyMissing { provider: "openai" })?;
            Ok(Box::new(OpenAiEmbedder::new(
                &key,
                config.base_url.as_deref(),
                config.embedding_model.clone(),
            )))
        }
        #[cfg(feature = "fastembed-embeddings")]
        "fastembed" => Ok(Box::new(FastEmbedder::new()?)),
        other => Err(EmbeddingError::Unsupported {
            name: other.to_string(),
        }),
    }
}

/// Cosine similarity between two vectors.
///
/// Returns `0.0` when either vector has zero magnitude, the lengths differ,
/// or the result is not finite. The value is clamped to `[-1.0, 1.0]` so
/// floating-point drift never leaves the valid range.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    if sim.is_finite() {
        sim.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}
