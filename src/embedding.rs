//! Embedding providers
//!
//! The pipeline embeds each query exactly once, before round-1 search, and
//! reuses the vector for the filtered round. Production uses fastembed
//! (ONNX Runtime) behind the `embeddings` feature; tests and offline runs
//! use the deterministic `HashEmbedder`.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from embedding providers
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider unreachable: {0}")]
    Unreachable(String),

    #[error("embedding model error: {0}")]
    Model(String),

    #[error("embedding returned no results")]
    EmptyResult,
}

/// Provider of fixed-length dense vectors for text
///
/// Implementations handle model loading and inference. The call is treated
/// as an opaque external service: failure aborts the query it belongs to.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one text into a fixed-length dense vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Dimensionality of produced vectors.
    fn dimensions(&self) -> usize;
}

/// Deterministic hashing embedder
///
/// Buckets tokens by hash and L2-normalizes the counts. No semantics, but
/// stable across runs and platforms, which is what tests and the in-memory
/// index need.
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut vector = vec![0.0f32; self.dimensions];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in vector.iter_mut() {
                *x /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(feature = "embeddings")]
mod fastembed_impl {
    use super::{Embedder, EmbeddingError};
    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use std::sync::Mutex;

    /// Production embedder backed by fastembed (ONNX Runtime).
    ///
    /// Wraps `fastembed::TextEmbedding` in a `Mutex` because its `embed`
    /// method requires `&mut self`, while the `Embedder` trait uses `&self`.
    pub struct FastEmbedEmbedder {
        model: Mutex<TextEmbedding>,
        dimensions: usize,
    }

    impl FastEmbedEmbedder {
        /// Create a new FastEmbedEmbedder with a specific model.
        pub fn new(model: EmbeddingModel, dimensions: usize) -> Result<Self, EmbeddingError> {
            let options = InitOptions::new(model).with_show_download_progress(false);
            let embedding =
                TextEmbedding::try_new(options).map_err(|e| EmbeddingError::Model(e.to_string()))?;
            Ok(Self {
                model: Mutex::new(embedding),
                dimensions,
            })
        }

        /// Create a new FastEmbedEmbedder with the default model (nomic-embed-text-v1.5).
        pub fn default_model() -> Result<Self, EmbeddingError> {
            Self::new(
                EmbeddingModel::NomicEmbedTextV15,
                crate::storage::DEFAULT_EMBEDDING_DIMENSIONS,
            )
        }
    }

    #[async_trait]
    impl Embedder for FastEmbedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let mut model = self.model.lock().unwrap();
            let mut embeddings = model
                .embed(vec![text.to_string()], None)
                .map_err(|e| EmbeddingError::Model(e.to_string()))?;
            match embeddings.pop() {
                Some(vector) => Ok(vector),
                None => Err(EmbeddingError::EmptyResult),
            }
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }
    }
}

#[cfg(feature = "embeddings")]
pub use fastembed_impl::FastEmbedEmbedder;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::new(16);
        let a = embedder.embed("graph retrieval").await.unwrap();
        let b = embedder.embed("graph retrieval").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[tokio::test]
    async fn hash_embedder_output_is_normalized() {
        let embedder = HashEmbedder::default();
        let v = embedder.embed("attention is all you need").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn different_texts_differ() {
        let embedder = HashEmbedder::new(32);
        let a = embedder.embed("support vector machine").await.unwrap();
        let b = embedder.embed("convolutional network").await.unwrap();
        assert_ne!(a, b);
    }
}
