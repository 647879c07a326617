//! Deterministic stand-ins for the external model backends and store

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::ProviderError;
use crate::database::sqlite::{KnowledgeEntry, NewKnowledgeEntry};
use crate::embeddings::{Embedding, EmbeddingProvider};
use crate::generation::{GenerativeModel, StructuredReply};
use crate::knowledge::KnowledgeStore;

/// Returns the vector of the first key contained in the text
#[derive(Debug, Default)]
pub(crate) struct ScriptedEmbedder {
    table: Vec<(String, Embedding)>,
    fallback: Option<Embedding>,
    calls: AtomicUsize,
}

impl ScriptedEmbedder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, key: &str, vector: Embedding) -> Self {
        self.table.push((key.to_string(), vector));
        self
    }

    pub(crate) fn with_fallback(mut self, vector: Embedding) -> Self {
        self.fallback = Some(vector);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table
            .iter()
            .find(|(key, _)| text.contains(key.as_str()))
            .map(|(_, vector)| vector.clone())
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| ProviderError::Unreachable(format!("no scripted vector for {text:?}")))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Every call fails as if the backend were down
#[derive(Debug, Default)]
pub(crate) struct FailingEmbedder {
    calls: AtomicUsize,
}

impl FailingEmbedder {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Embedding, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::Unreachable("connection refused".to_string()))
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Returns a fixed reply and records the prompts it was given
#[derive(Debug)]
pub(crate) struct ScriptedModel {
    reply: Result<StructuredReply, ProviderError>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedModel {
    pub(crate) fn replying(reply: &str, speak: &str) -> Self {
        Self {
            reply: Ok(StructuredReply {
                reply: reply.to_string(),
                speak: speak.to_string(),
            }),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(error: ProviderError) -> Self {
        Self {
            reply: Err(error),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// (system, user) prompts received so far
    pub(crate) fn prompts(&self) -> Vec<(String, String)> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<StructuredReply, ProviderError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push((system_prompt.to_string(), user_prompt.to_string()));
        }
        self.reply.clone()
    }
}

/// A store whose backend is unavailable
#[derive(Debug, Default)]
pub(crate) struct UnavailableStore;

#[async_trait]
impl KnowledgeStore for UnavailableStore {
    async fn list_all(&self) -> Result<Vec<KnowledgeEntry>> {
        Err(anyhow!("database is locked"))
    }

    async fn list_by_module(&self, _module_id: i64) -> Result<Vec<KnowledgeEntry>> {
        Err(anyhow!("database is locked"))
    }

    async fn get_by_title(&self, _title: &str) -> Result<Option<KnowledgeEntry>> {
        Err(anyhow!("database is locked"))
    }

    async fn insert(&self, _entry: &NewKnowledgeEntry) -> Result<KnowledgeEntry> {
        Err(anyhow!("database is locked"))
    }

    async fn update_embedding(&self, _id: i64, _embedding: &[f32]) -> Result<bool> {
        Err(anyhow!("database is locked"))
    }
}

pub(crate) fn new_entry(title: &str, content: &str, module_id: Option<i64>) -> NewKnowledgeEntry {
    NewKnowledgeEntry {
        title: title.to_string(),
        content: content.to_string(),
        module_id,
    }
}
