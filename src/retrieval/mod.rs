// Retrieval module
// Cosine ranking over cached knowledge embeddings

pub mod retriever;
pub mod similarity;

pub use retriever::{EntryEmbedding, Retriever, ScoredEntry};
pub use similarity::{DIMENSION_MISMATCH_SCORE, Ranked, cosine_similarity, rank};

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;
pub const DEFAULT_RESULT_LIMIT: usize = 3;

/// Per-call ranking parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalOptions {
    /// Minimum cosine similarity, inclusive
    pub threshold: f32,
    pub limit: usize,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            limit: DEFAULT_RESULT_LIMIT,
        }
    }
}

impl RetrievalOptions {
    /// Defaults with optional per-call overrides
    #[inline]
    #[must_use]
    pub fn with_overrides(self, limit: Option<usize>, threshold: Option<f32>) -> Self {
        Self {
            threshold: threshold.unwrap_or(self.threshold),
            limit: limit.unwrap_or(self.limit),
        }
    }
}
