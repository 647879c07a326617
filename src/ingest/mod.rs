// Ingestion pipeline
// Bulk-loads curated knowledge entries, skipping what is already present

pub mod seed;

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::database::sqlite::NewKnowledgeEntry;
use crate::knowledge::{CourseCatalogue, KnowledgeStore};
use crate::retrieval::Retriever;

pub use seed::{PreparedSeed, SeedEntry, SeedFile};

/// Per-batch outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
    /// Title already present in the store or earlier in the batch
    pub duplicates: usize,
    /// Referenced a module the catalogue does not know
    pub orphaned: usize,
    /// Blank title or content
    pub invalid: usize,
    /// Store or catalogue errors for individual entries
    pub failed: usize,
    /// Embeddings computed at ingest time and written to the store
    pub embedded: usize,
    /// Embeddings computed at ingest time that the store did not keep
    pub uncached: usize,
}

impl IngestReport {
    #[inline]
    pub fn skipped(&self) -> usize {
        self.duplicates + self.orphaned + self.invalid + self.failed
    }

    #[inline]
    pub fn merge(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.orphaned += other.orphaned;
        self.invalid += other.invalid;
        self.failed += other.failed;
        self.embedded += other.embedded;
        self.uncached += other.uncached;
    }
}

impl fmt::Display for IngestReport {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} inserted, {} duplicate, {} orphaned, {} invalid, {} failed",
            self.inserted, self.duplicates, self.orphaned, self.invalid, self.failed
        )?;
        if self.embedded > 0 {
            write!(f, ", {} embedded", self.embedded)?;
        }
        if self.uncached > 0 {
            write!(f, ", {} not cached", self.uncached)?;
        }
        Ok(())
    }
}

enum Precompute {
    Off,
    Cached,
    Uncached,
}

enum Outcome {
    Inserted(Precompute),
    Duplicate,
    Orphaned,
    Invalid,
    Failed,
}

pub struct Ingestor {
    store: Arc<dyn KnowledgeStore>,
    catalogue: Arc<dyn CourseCatalogue>,
    precompute: Option<Arc<Retriever>>,
}

impl Ingestor {
    #[inline]
    pub fn new(store: Arc<dyn KnowledgeStore>, catalogue: Arc<dyn CourseCatalogue>) -> Self {
        Self {
            store,
            catalogue,
            precompute: None,
        }
    }

    /// Embed new entries as they are inserted instead of on first retrieval
    #[inline]
    #[must_use]
    pub fn with_precompute(mut self, retriever: Arc<Retriever>) -> Self {
        self.precompute = Some(retriever);
        self
    }

    /// Insert every valid, new, correctly-referenced entry.
    ///
    /// Idempotent by title. Individual failures are logged and counted; the
    /// batch always runs to completion.
    #[inline]
    pub async fn ingest(&self, entries: Vec<NewKnowledgeEntry>) -> IngestReport {
        let mut report = IngestReport::default();
        let mut seen = HashSet::new();
        let total = entries.len();

        for entry in entries {
            match self.ingest_one(entry, &mut seen).await {
                Outcome::Inserted(precompute) => {
                    report.inserted += 1;
                    match precompute {
                        Precompute::Off => {}
                        Precompute::Cached => report.embedded += 1,
                        Precompute::Uncached => report.uncached += 1,
                    }
                }
                Outcome::Duplicate => report.duplicates += 1,
                Outcome::Orphaned => report.orphaned += 1,
                Outcome::Invalid => report.invalid += 1,
                Outcome::Failed => report.failed += 1,
            }
        }

        info!("Ingested batch of {}: {}", total, report);
        report
    }

    async fn ingest_one(&self, entry: NewKnowledgeEntry, seen: &mut HashSet<String>) -> Outcome {
        let title = entry.title.trim().to_string();
        let content = entry.content.trim().to_string();
        if title.is_empty() || content.is_empty() {
            warn!(
                "Skipping invalid knowledge entry {:?}: title and content are required",
                entry.title
            );
            return Outcome::Invalid;
        }

        if !seen.insert(title.clone()) {
            debug!("Skipping {:?}: repeated within the batch", title);
            return Outcome::Duplicate;
        }

        match self.store.get_by_title(&title).await {
            Ok(Some(_)) => {
                debug!("Skipping {:?}: already in the knowledge base", title);
                return Outcome::Duplicate;
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Skipping {:?}: duplicate check failed: {}", title, e);
                return Outcome::Failed;
            }
        }

        if let Some(module_id) = entry.module_id {
            match self.catalogue.module_exists(module_id).await {
                Ok(true) => {}
                Ok(false) => {
                    info!(
                        "Dropping {:?}: course module {} does not exist",
                        title, module_id
                    );
                    return Outcome::Orphaned;
                }
                Err(e) => {
                    warn!(
                        "Dropping {:?}: could not look up course module {}: {}",
                        title, module_id, e
                    );
                    return Outcome::Failed;
                }
            }
        }

        let new_entry = NewKnowledgeEntry {
            title,
            content,
            module_id: entry.module_id,
        };
        let created = match self.store.insert(&new_entry).await {
            Ok(created) => created,
            Err(e) => {
                warn!("Failed to insert {:?}: {}", new_entry.title, e);
                return Outcome::Failed;
            }
        };
        debug!("Inserted knowledge entry {} ({})", created.id, created.title);

        let precompute = match &self.precompute {
            Some(retriever) => match retriever.embed_entry(&created).await {
                Ok(computed) if computed.cached => Precompute::Cached,
                Ok(_) => Precompute::Uncached,
                Err(e) => {
                    warn!(
                        "Could not precompute embedding for {:?}, it will be computed on first use: {}",
                        created.title, e
                    );
                    Precompute::Off
                }
            },
            None => Precompute::Off,
        };

        Outcome::Inserted(precompute)
    }
}
