
use std::collections::HashSet;
use std::sync::RwLock;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;

use super::{CourseCatalogue, KnowledgeStore};
use crate::database::sqlite::{KnowledgeEntry, NewKnowledgeEntry};

/// In-memory knowledge store and catalogue.
///
/// Brute-force and unindexed; suitable for tests and small demos.
#[derive(Debug, Default)]
pub struct MemoryKnowledgeStore {
    state: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: Vec<KnowledgeEntry>,
    modules: HashSet<i64>,
    next_id: i64,
}

impl MemoryKnowledgeStore {
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose catalogue knows the given module ids
    #[must_use]
    #[inline]
    pub fn with_modules<I: IntoIterator<Item = i64>>(modules: I) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.state.write() {
            state.modules.extend(modules);
        }
        store
    }

    #[inline]
    pub fn add_module(&self, module_id: i64) -> Result<()> {
        self.write()?.modules.insert(module_id);
        Ok(())
    }

    /// Insert an entry with a pre-computed embedding
    #[inline]
    pub fn insert_with_embedding(
        &self,
        entry: NewKnowledgeEntry,
        embedding: Option<Vec<f32>>,
    ) -> Result<KnowledgeEntry> {
        let mut state = self.write()?;
        if state.entries.iter().any(|e| e.title == entry.title) {
            return Err(anyhow!("Knowledge entry titled {:?} already exists", entry.title));
        }

        state.next_id += 1;
        let now = Utc::now().naive_utc();
        let created = KnowledgeEntry {
            id: state.next_id,
            title: entry.title,
            content: entry.content,
            module_id: entry.module_id,
            embedding,
            created_date: now,
            updated_date: now,
        };
        state.entries.push(created.clone());
        Ok(created)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.state.read().map_or(0, |state| state.entries.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of an entry by id
    #[inline]
    pub fn get(&self, id: i64) -> Option<KnowledgeEntry> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.entries.iter().find(|e| e.id == id).cloned())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| anyhow!("memory knowledge store lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| anyhow!("memory knowledge store lock poisoned"))
    }
}

#[async_trait]
impl KnowledgeStore for MemoryKnowledgeStore {
    #[inline]
    async fn list_all(&self) -> Result<Vec<KnowledgeEntry>> {
        Ok(self.read()?.entries.clone())
    }

    #[inline]
    async fn list_by_module(&self, module_id: i64) -> Result<Vec<KnowledgeEntry>> {
        Ok(self
            .read()?
            .entries
            .iter()
            .filter(|e| e.module_id == Some(module_id))
            .cloned()
            .collect())
    }

    #[inline]
    async fn get_by_title(&self, title: &str) -> Result<Option<KnowledgeEntry>> {
        Ok(self
            .read()?
            .entries
            .iter()
            .find(|e| e.title == title)
            .cloned())
    }

    #[inline]
    async fn insert(&self, entry: &NewKnowledgeEntry) -> Result<KnowledgeEntry> {
        self.insert_with_embedding(entry.clone(), None)
    }

    #[inline]
    async fn update_embedding(&self, id: i64, embedding: &[f32]) -> Result<bool> {
        let mut state = self.write()?;
        match state.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.embedding = Some(embedding.to_vec());
                entry.updated_date = Utc::now().naive_utc();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl CourseCatalogue for MemoryKnowledgeStore {
    #[inline]
    async fn module_exists(&self, module_id: i64) -> Result<bool> {
        Ok(self.read()?.modules.contains(&module_id))
    }
}
