
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::RetrievalOptions;
use super::similarity::rank;
use crate::database::sqlite::KnowledgeEntry;
use crate::embeddings::{Embedding, EmbeddingProvider};
use crate::knowledge::KnowledgeStore;
use crate::{ProfessorError, ProviderError};

/// A retrieved entry together with its cosine similarity to the query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntry {
    pub entry: KnowledgeEntry,
    pub score: f32,
}

/// A freshly computed entry vector and whether it reached the store
#[derive(Debug, Clone, PartialEq)]
pub struct EntryEmbedding {
    pub vector: Embedding,
    pub cached: bool,
}

/// Finds knowledge entries relevant to a question.
///
/// Embeddings missing from the store are computed on first use and written
/// back, so each entry is embedded at most once per model.
pub struct Retriever {
    store: Arc<dyn KnowledgeStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    expected_dimension: Option<usize>,
}

impl Retriever {
    #[inline]
    pub fn new(store: Arc<dyn KnowledgeStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            embedder,
            expected_dimension: None,
        }
    }

    /// Refuse to persist computed vectors whose length differs from `dimension`
    #[inline]
    #[must_use]
    pub fn with_expected_dimension(mut self, dimension: usize) -> Self {
        self.expected_dimension = Some(dimension);
        self
    }

    #[inline]
    pub fn store(&self) -> &Arc<dyn KnowledgeStore> {
        &self.store
    }

    #[inline]
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Relevant entries, most similar first.
    ///
    /// Never fails: when the embedding backend or the store is unavailable the
    /// result is empty and the caller answers from general knowledge.
    #[inline]
    pub async fn find_relevant(
        &self,
        query: &str,
        module_id: Option<i64>,
        options: RetrievalOptions,
    ) -> Vec<KnowledgeEntry> {
        match self.find_relevant_scored(query, module_id, options).await {
            Ok(scored) => scored.into_iter().map(|s| s.entry).collect(),
            Err(e) => {
                warn!("Knowledge retrieval failed, continuing without grounding: {}", e);
                Vec::new()
            }
        }
    }

    /// Same as [`Retriever::find_relevant`] but keeps the scores and surfaces
    /// query-level failures instead of swallowing them.
    #[inline]
    pub async fn find_relevant_scored(
        &self,
        query: &str,
        module_id: Option<i64>,
        options: RetrievalOptions,
    ) -> Result<Vec<ScoredEntry>, ProfessorError> {
        if query.trim().is_empty() {
            debug!("Empty query, skipping retrieval");
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        if let Some(expected) = self.expected_dimension {
            if query_embedding.len() != expected {
                warn!(
                    "Query embedding has {} dimensions but {} are configured",
                    query_embedding.len(),
                    expected
                );
            }
        }

        let mut candidates = match module_id {
            Some(id) => self.store.list_by_module(id).await?,
            None => self.store.list_all().await?,
        };
        if let Some(id) = module_id {
            candidates.retain(|entry| entry.module_id == Some(id));
        }
        debug!(
            "Scoring {} candidate entries (module: {:?})",
            candidates.len(),
            module_id
        );

        let mut computed = 0_usize;
        let mut skipped = 0_usize;
        for entry in candidates.iter_mut().filter(|e| e.embedding.is_none()) {
            match self.embed_entry(entry).await {
                Ok(computed_embedding) => {
                    entry.embedding = Some(computed_embedding.vector);
                    computed += 1;
                }
                Err(e) => {
                    warn!(
                        "Skipping entry {} ({}): embedding failed: {}",
                        entry.id, entry.title, e
                    );
                    skipped += 1;
                }
            }
        }
        if computed > 0 || skipped > 0 {
            info!("Lazily embedded {} entries ({} skipped)", computed, skipped);
        }

        let ranked = rank(
            &query_embedding,
            candidates
                .iter()
                .enumerate()
                .filter_map(|(index, entry)| entry.embedding.as_deref().map(|v| (index, v))),
            options.threshold,
            options.limit,
        );

        Ok(ranked
            .into_iter()
            .filter_map(|r| {
                candidates.get(r.item).map(|entry| ScoredEntry {
                    entry: entry.clone(),
                    score: r.score,
                })
            })
            .collect())
    }

    /// Compute the embedding for `entry` and write it back to the store.
    ///
    /// A vector of the wrong length, or one the store refuses, is logged and
    /// still returned with `cached` unset.
    #[inline]
    pub async fn embed_entry(
        &self,
        entry: &KnowledgeEntry,
    ) -> Result<EntryEmbedding, ProviderError> {
        let vector = self.embedder.embed(&entry.embedding_text()).await?;

        if let Some(expected) = self.expected_dimension {
            if vector.len() != expected {
                warn!(
                    "Not caching embedding for entry {} ({}): got {} dimensions, {} configured",
                    entry.id,
                    entry.title,
                    vector.len(),
                    expected
                );
                return Ok(EntryEmbedding {
                    vector,
                    cached: false,
                });
            }
        }

        let cached = match self.store.update_embedding(entry.id, &vector).await {
            Ok(true) => {
                debug!("Cached embedding for entry {}", entry.id);
                true
            }
            Ok(false) => {
                warn!(
                    "Entry {} ({}) disappeared before its embedding could be cached",
                    entry.id, entry.title
                );
                false
            }
            Err(e) => {
                warn!(
                    "Failed to cache embedding for entry {} ({}): {}",
                    entry.id, entry.title, e
                );
                false
            }
        };

        Ok(EntryEmbedding { vector, cached })
    }
}
