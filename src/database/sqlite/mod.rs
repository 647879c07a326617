use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};


pub mod models;
pub mod queries;

pub use models::{
    ChatExchange, CourseModule, KnowledgeEntry, KnowledgeStatistics, NewChatExchange,
    NewCourseModule, NewKnowledgeEntry,
};
pub use queries::{ChatQueries, KnowledgeQueries, ModuleQueries, StatisticsQueries};

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    #[inline]
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    #[inline]
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    #[inline]
    pub async fn initialize_from_config_dir(config_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        Self::new(config_dir.join("professor.db")).await
    }

    // Knowledge operations
    #[inline]
    pub async fn list_entries(&self) -> Result<Vec<KnowledgeEntry>> {
        KnowledgeQueries::list_all(&self.pool).await
    }

    #[inline]
    pub async fn list_entries_for_module(&self, module_id: i64) -> Result<Vec<KnowledgeEntry>> {
        KnowledgeQueries::list_by_module(&self.pool, module_id).await
    }

    #[inline]
    pub async fn insert_entry(&self, entry: &NewKnowledgeEntry) -> Result<KnowledgeEntry> {
        KnowledgeQueries::create(&self.pool, entry.clone()).await
    }

    #[inline]
    pub async fn get_entry_by_title(&self, title: &str) -> Result<Option<KnowledgeEntry>> {
        KnowledgeQueries::get_by_title(&self.pool, title).await
    }

    #[inline]
    pub async fn update_entry_embedding(&self, id: i64, embedding: &[f32]) -> Result<bool> {
        KnowledgeQueries::update_embedding(&self.pool, id, embedding).await
    }

    #[inline]
    pub async fn clear_embeddings(&self) -> Result<u64> {
        KnowledgeQueries::clear_embeddings(&self.pool).await
    }

    // Course catalogue operations
    #[inline]
    pub async fn create_module(&self, module: &NewCourseModule) -> Result<CourseModule> {
        ModuleQueries::create(&self.pool, module.clone()).await
    }

    #[inline]
    pub async fn get_module_by_title(&self, title: &str) -> Result<Option<CourseModule>> {
        ModuleQueries::get_by_title(&self.pool, title).await
    }

    #[inline]
    pub async fn list_modules(&self) -> Result<Vec<CourseModule>> {
        ModuleQueries::list_all(&self.pool).await
    }

    // Chat history operations
    #[inline]
    pub async fn record_exchange(&self, exchange: &NewChatExchange) -> Result<ChatExchange> {
        ChatQueries::create(&self.pool, exchange.clone()).await
    }

    #[inline]
    pub async fn recent_exchanges(&self, user_id: &str, limit: usize) -> Result<Vec<ChatExchange>> {
        ChatQueries::recent_for_user(&self.pool, user_id, limit).await
    }

    #[inline]
    pub async fn statistics(&self) -> Result<KnowledgeStatistics> {
        StatisticsQueries::collect(&self.pool).await
    }
}
