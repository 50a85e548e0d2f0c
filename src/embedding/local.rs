//! Local ONNX embeddings via `fastembed`.

use std::sync::Mutex;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::Embedder;
use crate::error::EmbeddingError;

/// Embedder running `BGE-small-en-v1.5` locally.
///
/// `TextEmbedding::embed` needs `&mut self`, so the model sits behind a
/// mutex to keep the embedder `Sync`.
pub struct FastEmbedder {
    model: Mutex<TextEmbedding>,
}

impl FastEmbedder {
    /// Loads (downloading on first use) the local model.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError::Request`] if the model cannot be loaded.
    pub fn new() -> Result<Self, EmbeddingError> {
        let model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::BGESmallENV15).with_show_download_progress(false),
        )
        .map_err(|e| EmbeddingError::Request {
            provider: "fastembed",
            message: e.to_string(),
        })?;
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    fn name(&self) -> &'static str {
        "fastembed"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut model = self.model.lock().map_err(|e| EmbeddingError::Request {
            provider: "fastembed",
            message: format!("model lock poisoned: {e}"),
        })?;
        let embeddings = model
            .embed(vec![text], None)
            .map_err(|e| EmbeddingError::Request {
                provider: "fastembed",
                message: e.to_string(),
            })?;
        embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or(EmbeddingError::EmptyVector {
                provider: "fastembed",
            })
    }
}
