//! Persistence contract consumed by retrieval and ingestion.
//!
//! `Database` is the production implementation; `MemoryKnowledgeStore` keeps
//! everything in process for tests and demos.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::database::sqlite::{Database, KnowledgeEntry, NewKnowledgeEntry};

pub use memory::MemoryKnowledgeStore;

#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<KnowledgeEntry>>;

    async fn list_by_module(&self, module_id: i64) -> Result<Vec<KnowledgeEntry>>;

    async fn get_by_title(&self, title: &str) -> Result<Option<KnowledgeEntry>>;

    async fn insert(&self, entry: &NewKnowledgeEntry) -> Result<KnowledgeEntry>;

    /// Returns false when the entry no longer exists
    async fn update_embedding(&self, id: i64, embedding: &[f32]) -> Result<bool>;
}

/// The slice of the course catalogue the retrieval core needs
#[async_trait]
pub trait CourseCatalogue: Send + Sync {
    async fn module_exists(&self, module_id: i64) -> Result<bool>;
}

#[async_trait]
impl KnowledgeStore for Database {
    #[inline]
    async fn list_all(&self) -> Result<Vec<KnowledgeEntry>> {
        self.list_entries().await
    }

    #[inline]
    async fn list_by_module(&self, module_id: i64) -> Result<Vec<KnowledgeEntry>> {
        self.list_entries_for_module(module_id).await
    }

    #[inline]
    async fn get_by_title(&self, title: &str) -> Result<Option<KnowledgeEntry>> {
        self.get_entry_by_title(title).await
    }

    #[inline]
    async fn insert(&self, entry: &NewKnowledgeEntry) -> Result<KnowledgeEntry> {
        self.insert_entry(entry).await
    }

    #[inline]
    async fn update_embedding(&self, id: i64, embedding: &[f32]) -> Result<bool> {
        self.update_entry_embedding(id, embedding).await
    }
}

#[async_trait]
impl CourseCatalogue for Database {
    #[inline]
    async fn module_exists(&self, module_id: i64) -> Result<bool> {
        crate::database::sqlite::ModuleQueries::exists(self.pool(), module_id).await
    }
}
