#[cfg(test)]
mod tests;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::warn;

use crate::embeddings::Embedding;

/// A single retrievable unit of curated reference text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub module_id: Option<i64>,
    pub embedding: Option<Embedding>,
    pub created_date: NaiveDateTime,
    pub updated_date: NaiveDateTime,
}

/// Raw row; the embedding column holds a JSON array
#[derive(Debug, Clone, FromRow)]
pub(crate) struct KnowledgeEntryRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub module_id: Option<i64>,
    pub embedding: Option<String>,
    pub created_date: NaiveDateTime,
    pub updated_date: NaiveDateTime,
}

impl From<KnowledgeEntryRow> for KnowledgeEntry {
    #[inline]
    fn from(row: KnowledgeEntryRow) -> Self {
        let embedding = row.embedding.as_deref().and_then(|raw| {
            decode_embedding(raw)
                .inspect_err(|e| {
                    warn!(
                        "Discarding unreadable cached embedding for entry {} ({}): {}",
                        row.id, row.title, e
                    );
                })
                .ok()
        });

        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            module_id: row.module_id,
            embedding,
            created_date: row.created_date,
            updated_date: row.updated_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewKnowledgeEntry {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub module_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CourseModule {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCourseModule {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One persisted question/answer turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ChatExchange {
    pub id: i64,
    pub user_id: String,
    pub question: String,
    pub answer: String,
    pub confidence: f64,
    pub source: String,
    pub module_id: Option<i64>,
    pub created_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChatExchange {
    pub user_id: String,
    pub question: String,
    pub answer: String,
    pub confidence: f64,
    pub source: String,
    pub module_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeStatistics {
    pub total_entries: i64,
    pub embedded_entries: i64,
    pub modules: i64,
    pub chat_exchanges: i64,
}

impl KnowledgeEntry {
    #[inline]
    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }

    /// Text fed to the embedding model for this entry
    #[inline]
    pub fn embedding_text(&self) -> String {
        format!("{}\n\n{}", self.title, self.content)
    }
}

impl KnowledgeStatistics {
    #[inline]
    pub fn pending_embeddings(&self) -> i64 {
        self.total_entries - self.embedded_entries
    }
}

#[inline]
pub fn encode_embedding(embedding: &[f32]) -> serde_json::Result<String> {
    serde_json::to_string(embedding)
}

#[inline]
pub fn decode_embedding(raw: &str) -> serde_json::Result<Embedding> {
    serde_json::from_str(raw)
}
