//! TOML seed files describing course modules and their knowledge entries.
//!
//! ```toml
//! [[modules]]
//! title = "Rust Basics"
//! description = "Variables, types and control flow"
//!
//! [[entries]]
//! title = "Shadowing"
//! content = "A later `let` can reuse a name..."
//! module = "Rust Basics"
//! ```

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::database::sqlite::{Database, NewCourseModule, NewKnowledgeEntry};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub modules: Vec<NewCourseModule>,
    #[serde(default)]
    pub entries: Vec<SeedEntry>,
}

/// An entry may reference its module by id or by title
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub module_id: Option<i64>,
    #[serde(default)]
    pub module: Option<String>,
}

/// Seed entries with module references resolved to ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedSeed {
    pub entries: Vec<NewKnowledgeEntry>,
    pub modules_created: usize,
    /// Entries dropped because their module title matched nothing
    pub unresolved: usize,
}

impl SeedFile {
    #[inline]
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse seed file")
    }

    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file: {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Invalid seed file: {}", path.display()))
    }

    /// Create any modules not yet in the catalogue and resolve title
    /// references to module ids
    #[inline]
    pub async fn prepare(self, database: &Database) -> Result<PreparedSeed> {
        let mut modules_created = 0;
        for module in self.modules {
            let title = module.title.trim();
            if title.is_empty() {
                warn!("Skipping seed module without a title");
                continue;
            }
            if database.get_module_by_title(title).await?.is_none() {
                let created = database
                    .create_module(&NewCourseModule {
                        title: title.to_string(),
                        description: module.description,
                    })
                    .await?;
                info!("Created course module {} ({})", created.id, created.title);
                modules_created += 1;
            }
        }

        let module_ids: HashMap<String, i64> = database
            .list_modules()
            .await?
            .into_iter()
            .map(|m| (m.title, m.id))
            .collect();

        let mut unresolved = 0;
        let mut entries = Vec::with_capacity(self.entries.len());
        for entry in self.entries {
            let module_id = match (entry.module_id, entry.module.as_deref().map(str::trim)) {
                (Some(id), Some(title)) => {
                    if module_ids.get(title) != Some(&id) {
                        warn!(
                            "Dropping seed entry {:?}: module {:?} and module_id {} disagree",
                            entry.title, title, id
                        );
                        unresolved += 1;
                        continue;
                    }
                    Some(id)
                }
                (Some(id), None) => Some(id),
                (None, Some(title)) => {
                    let Some(&id) = module_ids.get(title) else {
                        info!(
                            "Dropping seed entry {:?}: no course module titled {:?}",
                            entry.title, title
                        );
                        unresolved += 1;
                        continue;
                    };
                    Some(id)
                }
                (None, None) => None,
            };

            entries.push(NewKnowledgeEntry {
                title: entry.title,
                content: entry.content,
                module_id,
            });
        }

        debug!(
            "Prepared {} seed entries ({} modules created, {} unresolved)",
            entries.len(),
            modules_created,
            unresolved
        );

        Ok(PreparedSeed {
            entries,
            modules_created,
            unresolved,
        })
    }
}
