//! The retrieval core as one object: question in, grounded answer out.
//!
//! Callers describe who is asking with a [`RequestContext`]. Guests get the
//! same answers as signed-in users but their turns are neither read from nor
//! written to chat history.


use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use itertools::Itertools;
use tracing::{debug, warn};

use crate::answer::{Answer, AnswerComposer};
use crate::config::Config;
use crate::database::sqlite::{
    ChatExchange, Database, KnowledgeEntry, NewChatExchange, NewKnowledgeEntry,
};
use crate::embeddings::OllamaClient;
use crate::generation::{GenerativeModel, OpenAiChatClient};
use crate::ingest::{IngestReport, Ingestor};
use crate::knowledge::{CourseCatalogue, KnowledgeStore};
use crate::retrieval::{RetrievalOptions, Retriever, ScoredEntry};
use crate::{ProfessorError, Result};

/// Who is asking, scoped to a single request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: Option<String>,
    pub acting_as_guest: bool,
}

impl RequestContext {
    #[inline]
    pub fn guest() -> Self {
        Self {
            user_id: None,
            acting_as_guest: true,
        }
    }

    #[inline]
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            acting_as_guest: false,
        }
    }

    /// The user whose history may be read and written, if any
    #[inline]
    pub fn history_user(&self) -> Option<&str> {
        if self.acting_as_guest {
            return None;
        }
        self.user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// One chat turn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AskRequest {
    pub question: String,
    pub module_id: Option<i64>,
    pub context: RequestContext,
}

/// Per-user conversation memory
#[async_trait]
pub trait ChatHistory: Send + Sync {
    /// Most recent exchanges, oldest first
    async fn recent(&self, user_id: &str, limit: usize) -> anyhow::Result<Vec<ChatExchange>>;

    async fn record(&self, exchange: &NewChatExchange) -> anyhow::Result<()>;
}

#[async_trait]
impl ChatHistory for Database {
    #[inline]
    async fn recent(&self, user_id: &str, limit: usize) -> anyhow::Result<Vec<ChatExchange>> {
        self.recent_exchanges(user_id, limit).await
    }

    #[inline]
    async fn record(&self, exchange: &NewChatExchange) -> anyhow::Result<()> {
        self.record_exchange(exchange).await.map(|_| ())
    }
}

pub struct Professor {
    retriever: Arc<Retriever>,
    composer: AnswerComposer,
    ingestor: Ingestor,
    history: Option<Arc<dyn ChatHistory>>,
    options: RetrievalOptions,
    history_turns: usize,
}

impl Professor {
    #[inline]
    pub fn new(
        retriever: Retriever,
        catalogue: Arc<dyn CourseCatalogue>,
        model: Arc<dyn GenerativeModel>,
    ) -> Self {
        let ingestor = Ingestor::new(Arc::clone(retriever.store()), catalogue);
        Self {
            retriever: Arc::new(retriever),
            composer: AnswerComposer::new(model),
            ingestor,
            history: None,
            options: RetrievalOptions::default(),
            history_turns: 0,
        }
    }

    /// Wire the Ollama embedder, the chat model and the SQLite store from config
    #[inline]
    pub fn from_config(config: &Config, database: Database) -> Result<Self> {
        let embedder = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
        let model = OpenAiChatClient::new(&config.generation)
            .context("Failed to create chat model client")?;
        if config.generation.api_key().is_none() {
            warn!(
                "{} is not set; chat requests will be sent without an API key",
                config.generation.api_key_env
            );
        }

        let database = Arc::new(database);
        let dimension = usize::try_from(config.ollama.embedding_dimension)
            .map_err(|_| ProfessorError::Config("embedding dimension out of range".to_string()))?;
        let retriever = Retriever::new(
            Arc::clone(&database) as Arc<dyn KnowledgeStore>,
            Arc::new(embedder),
        )
        .with_expected_dimension(dimension);

        let professor = Self::new(
            retriever,
            Arc::clone(&database) as Arc<dyn CourseCatalogue>,
            Arc::new(model),
        )
        .with_history(database, config.retrieval.history_turns)
        .with_options(config.retrieval.options());

        Ok(if config.ingest.precompute_embeddings {
            professor.with_precompute()
        } else {
            professor
        })
    }

    #[inline]
    #[must_use]
    pub fn with_history(mut self, history: Arc<dyn ChatHistory>, turns: usize) -> Self {
        self.history = Some(history);
        self.history_turns = turns;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_options(mut self, options: RetrievalOptions) -> Self {
        self.options = options;
        self
    }

    /// Embed entries at ingest time
    #[inline]
    #[must_use]
    pub fn with_precompute(mut self) -> Self {
        self.ingestor = self.ingestor.with_precompute(Arc::clone(&self.retriever));
        self
    }

    #[inline]
    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.retriever
    }

    #[inline]
    pub fn options(&self) -> RetrievalOptions {
        self.options
    }

    /// Relevant entries for a question; empty when nothing matches or the
    /// backends are unavailable
    #[inline]
    pub async fn find_relevant(
        &self,
        question: &str,
        module_id: Option<i64>,
        limit: Option<usize>,
        threshold: Option<f32>,
    ) -> Vec<KnowledgeEntry> {
        self.retriever
            .find_relevant(
                question,
                module_id,
                self.options.with_overrides(limit, threshold),
            )
            .await
    }

    #[inline]
    pub async fn find_relevant_scored(
        &self,
        question: &str,
        module_id: Option<i64>,
        limit: Option<usize>,
        threshold: Option<f32>,
    ) -> Result<Vec<ScoredEntry>> {
        self.retriever
            .find_relevant_scored(
                question,
                module_id,
                self.options.with_overrides(limit, threshold),
            )
            .await
    }

    /// Retrieve and compose. When no `recent_context` is given it is built
    /// from the requesting user's history, unless they act as a guest.
    #[inline]
    pub async fn compose_answer(
        &self,
        question: &str,
        module_id: Option<i64>,
        recent_context: Option<&str>,
        context: &RequestContext,
    ) -> Answer {
        let retrieved = self.find_relevant(question, module_id, None, None).await;
        let recent_context = match recent_context {
            Some(given) => given.to_string(),
            None => self.recent_context(context).await,
        };
        self.composer
            .compose(question, &retrieved, &recent_context)
            .await
    }

    /// Answer one chat turn and remember it for signed-in users
    #[inline]
    pub async fn ask(&self, request: AskRequest) -> Answer {
        let answer = self
            .compose_answer(&request.question, request.module_id, None, &request.context)
            .await;

        if let (Some(history), Some(user_id)) = (&self.history, request.context.history_user()) {
            let exchange = NewChatExchange {
                user_id: user_id.to_string(),
                question: request.question.clone(),
                answer: answer.reply.clone(),
                confidence: f64::from(answer.confidence),
                source: answer.source.clone(),
                module_id: request.module_id,
            };
            if let Err(e) = history.record(&exchange).await {
                warn!("Failed to record chat exchange for {}: {}", user_id, e);
            }
        }

        answer
    }

    /// Number of entries inserted
    #[inline]
    pub async fn ingest_batch(&self, entries: Vec<NewKnowledgeEntry>) -> usize {
        self.ingest(entries).await.inserted
    }

    #[inline]
    pub async fn ingest(&self, entries: Vec<NewKnowledgeEntry>) -> IngestReport {
        self.ingestor.ingest(entries).await
    }

    async fn recent_context(&self, context: &RequestContext) -> String {
        let (Some(history), Some(user_id)) = (&self.history, context.history_user()) else {
            return String::new();
        };
        if self.history_turns == 0 {
            return String::new();
        }

        match history.recent(user_id, self.history_turns).await {
            Ok(exchanges) => {
                debug!("Loaded {} previous exchanges for {}", exchanges.len(), user_id);
                format_history(&exchanges)
            }
            Err(e) => {
                warn!("Failed to load chat history for {}: {}", user_id, e);
                String::new()
            }
        }
    }
}

fn format_history(exchanges: &[ChatExchange]) -> String {
    exchanges
        .iter()
        .map(|exchange| format!("Student: {}\nProfessor: {}", exchange.question, exchange.answer))
        .join("\n")
}
