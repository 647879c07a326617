#[cfg(test)]
mod tests;

use super::models::*;
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

const KNOWLEDGE_COLUMNS: &str =
    "id, title, content, module_id, embedding, created_date, updated_date";

pub struct KnowledgeQueries;

impl KnowledgeQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, new_entry: NewKnowledgeEntry) -> Result<KnowledgeEntry> {
        let now = Utc::now().naive_utc();
        let id = sqlx::query(
            "INSERT INTO knowledge_entries (title, content, module_id, embedding, created_date, updated_date) VALUES (?, ?, ?, NULL, ?, ?)",
        )
        .bind(&new_entry.title)
        .bind(&new_entry.content)
        .bind(new_entry.module_id)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create knowledge entry")?
        .last_insert_rowid();

        Self::get_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created knowledge entry"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<KnowledgeEntry>> {
        let row = sqlx::query_as::<_, KnowledgeEntryRow>(&format!(
            "SELECT {KNOWLEDGE_COLUMNS} FROM knowledge_entries WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get knowledge entry by id")?;

        Ok(row.map(KnowledgeEntry::from))
    }

    #[inline]
    pub async fn get_by_title(pool: &SqlitePool, title: &str) -> Result<Option<KnowledgeEntry>> {
        let row = sqlx::query_as::<_, KnowledgeEntryRow>(&format!(
            "SELECT {KNOWLEDGE_COLUMNS} FROM knowledge_entries WHERE title = ?"
        ))
        .bind(title)
        .fetch_optional(pool)
        .await
        .context("Failed to get knowledge entry by title")?;

        Ok(row.map(KnowledgeEntry::from))
    }

    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<KnowledgeEntry>> {
        let rows = sqlx::query_as::<_, KnowledgeEntryRow>(&format!(
            "SELECT {KNOWLEDGE_COLUMNS} FROM knowledge_entries ORDER BY id ASC"
        ))
        .fetch_all(pool)
        .await
        .context("Failed to list knowledge entries")?;

        Ok(rows.into_iter().map(KnowledgeEntry::from).collect())
    }

    #[inline]
    pub async fn list_by_module(pool: &SqlitePool, module_id: i64) -> Result<Vec<KnowledgeEntry>> {
        let rows = sqlx::query_as::<_, KnowledgeEntryRow>(&format!(
            "SELECT {KNOWLEDGE_COLUMNS} FROM knowledge_entries WHERE module_id = ? ORDER BY id ASC"
        ))
        .bind(module_id)
        .fetch_all(pool)
        .await
        .context("Failed to list knowledge entries for module")?;

        Ok(rows.into_iter().map(KnowledgeEntry::from).collect())
    }

    /// Single-row write; concurrent writers for the same entry are last-write-wins
    #[inline]
    pub async fn update_embedding(pool: &SqlitePool, id: i64, embedding: &[f32]) -> Result<bool> {
        let encoded = encode_embedding(embedding).context("Failed to encode embedding")?;
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            "UPDATE knowledge_entries SET embedding = ?, updated_date = ? WHERE id = ?",
        )
        .bind(encoded)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update knowledge entry embedding")?;

        Ok(result.rows_affected() > 0)
    }

    /// Drop every cached embedding in one statement
    #[inline]
    pub async fn clear_embeddings(pool: &SqlitePool) -> Result<u64> {
        let now = Utc::now().naive_utc();
        let result = sqlx::query(
            "UPDATE knowledge_entries SET embedding = NULL, updated_date = ? WHERE embedding IS NOT NULL",
        )
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to clear cached embeddings")?;

        debug!("Cleared {} cached embeddings", result.rows_affected());
        Ok(result.rows_affected())
    }

}

pub struct ModuleQueries;

impl ModuleQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, new_module: NewCourseModule) -> Result<CourseModule> {
        let now = Utc::now().naive_utc();
        let id = sqlx::query(
            "INSERT INTO course_modules (title, description, created_date) VALUES (?, ?, ?)",
        )
        .bind(&new_module.title)
        .bind(&new_module.description)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create course module")?
        .last_insert_rowid();

        Self::get_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created course module"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<CourseModule>> {
        let module = sqlx::query_as::<_, CourseModule>(
            "SELECT id, title, description, created_date FROM course_modules WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get course module by id")?;

        Ok(module)
    }

    #[inline]
    pub async fn get_by_title(pool: &SqlitePool, title: &str) -> Result<Option<CourseModule>> {
        let module = sqlx::query_as::<_, CourseModule>(
            "SELECT id, title, description, created_date FROM course_modules WHERE title = ?",
        )
        .bind(title)
        .fetch_optional(pool)
        .await
        .context("Failed to get course module by title")?;

        Ok(module)
    }

    #[inline]
    pub async fn exists(pool: &SqlitePool, id: i64) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM course_modules WHERE id = ?)",
        )
        .bind(id)
        .fetch_one(pool)
        .await
        .context("Failed to check course module existence")?;

        Ok(exists)
    }

    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<CourseModule>> {
        let modules = sqlx::query_as::<_, CourseModule>(
            "SELECT id, title, description, created_date FROM course_modules ORDER BY id ASC",
        )
        .fetch_all(pool)
        .await
        .context("Failed to list course modules")?;

        Ok(modules)
    }
}

pub struct ChatQueries;

impl ChatQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, exchange: NewChatExchange) -> Result<ChatExchange> {
        let now = Utc::now().naive_utc();
        let id = sqlx::query(
            r#"
            INSERT INTO chat_exchanges (user_id, question, answer, confidence, source, module_id, created_date)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&exchange.user_id)
        .bind(&exchange.question)
        .bind(&exchange.answer)
        .bind(exchange.confidence)
        .bind(&exchange.source)
        .bind(exchange.module_id)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to record chat exchange")?
        .last_insert_rowid();

        let created = sqlx::query_as::<_, ChatExchange>(
            "SELECT id, user_id, question, answer, confidence, source, module_id, created_date FROM chat_exchanges WHERE id = ?",
        )
        .bind(id)
        .fetch_one(pool)
        .await
        .context("Failed to retrieve recorded chat exchange")?;

        Ok(created)
    }

    /// Most recent exchanges for a user, oldest first
    #[inline]
    pub async fn recent_for_user(
        pool: &SqlitePool,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatExchange>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut exchanges = sqlx::query_as::<_, ChatExchange>(
            r#"
            SELECT id, user_id, question, answer, confidence, source, module_id, created_date
            FROM chat_exchanges
            WHERE user_id = ?
            ORDER BY created_date DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to load recent chat exchanges")?;

        exchanges.reverse();
        Ok(exchanges)
    }
}

pub struct StatisticsQueries;

impl StatisticsQueries {
    #[inline]
    pub async fn collect(pool: &SqlitePool) -> Result<KnowledgeStatistics> {
        let (total_entries, embedded_entries, modules, chat_exchanges) =
            sqlx::query_as::<_, (i64, i64, i64, i64)>(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM knowledge_entries),
                    (SELECT COUNT(*) FROM knowledge_entries WHERE embedding IS NOT NULL),
                    (SELECT COUNT(*) FROM course_modules),
                    (SELECT COUNT(*) FROM chat_exchanges)
                "#,
            )
            .fetch_one(pool)
            .await
            .context("Failed to collect knowledge base statistics")?;

        Ok(KnowledgeStatistics {
            total_entries,
            embedded_entries,
            modules,
            chat_exchanges,
        })
    }
}
