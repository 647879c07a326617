// Embeddings module
// Turns text into fixed-length vectors for similarity ranking

pub mod ollama;

use async_trait::async_trait;

use crate::ProviderError;

pub use ollama::{DEFAULT_EMBEDDING_DIMENSION, OllamaClient};

/// A dense embedding vector
pub type Embedding = Vec<f32>;

/// Anything that can embed text. Implementations make a single attempt per call
/// and do not cache; callers decide whether a failure is fatal.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError>;

    fn model_name(&self) -> &str;
}
