use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::{info, warn};

use crate::answer::Answer;
use crate::config::{Config, get_config_dir};
use crate::database::sqlite::{Database, NewCourseModule};
use crate::embeddings::ollama::OllamaClient;
use crate::ingest::{IngestReport, SeedFile};
use crate::professor::{AskRequest, Professor, RequestContext};

/// Load configuration and open the knowledge base
async fn open(config_dir: Option<&Path>) -> Result<(Config, Database)> {
    let config_dir = get_config_dir(config_dir)?;
    let config = Config::load(&config_dir)?;
    std::fs::create_dir_all(config.get_base_dir()).with_context(|| {
        format!(
            "Failed to create config directory: {}",
            config.get_base_dir().display()
        )
    })?;

    let database = Database::new(config.database_path())
        .await
        .context("Failed to initialize database")?;

    Ok((config, database))
}

async fn open_professor(config_dir: Option<&Path>) -> Result<(Config, Database, Professor)> {
    let (config, database) = open(config_dir).await?;
    let professor = Professor::from_config(&config, database.clone())?;
    Ok((config, database, professor))
}

fn request_context(user: Option<String>, guest: bool) -> RequestContext {
    RequestContext {
        user_id: user,
        acting_as_guest: guest,
    }
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.reply);
    println!();
    println!(
        "{} {} · confidence {:.0}%",
        style("Source:").dim(),
        answer.source,
        answer.confidence * 100.0
    );
}

/// Ingest one seed file, creating the modules it declares
#[inline]
pub async fn ingest_seed_file(
    professor: &Professor,
    database: &Database,
    path: &Path,
) -> Result<IngestReport> {
    let prepared = SeedFile::load(path)?.prepare(database).await?;
    if prepared.modules_created > 0 {
        info!(
            "Created {} course modules from {}",
            prepared.modules_created,
            path.display()
        );
    }

    let mut report = professor.ingest(prepared.entries).await;
    report.orphaned += prepared.unresolved;
    Ok(report)
}

/// Ingest the seed files listed in the configuration. A missing or broken
/// file is logged and skipped.
#[inline]
pub async fn bootstrap(
    config: &Config,
    professor: &Professor,
    database: &Database,
) -> IngestReport {
    let mut total = IngestReport::default();
    for path in config.seed_file_paths() {
        match ingest_seed_file(professor, database, &path).await {
            Ok(report) => {
                info!("Seed file {}: {}", path.display(), report);
                total.merge(report);
            }
            Err(e) => warn!("Skipping seed file {}: {:#}", path.display(), e),
        }
    }
    total
}

/// Ingest knowledge entries from a TOML seed file
#[inline]
pub async fn ingest_file(config_dir: Option<&Path>, path: &Path) -> Result<()> {
    let (_config, database, professor) = open_professor(config_dir).await?;

    let report = ingest_seed_file(&professor, &database, path).await?;

    println!("Ingested {}", path.display());
    println!("   Inserted: {}", report.inserted);
    println!("   Duplicates skipped: {}", report.duplicates);
    if report.orphaned > 0 {
        println!("   Dropped (unknown module): {}", report.orphaned);
    }
    if report.invalid > 0 {
        println!("   Invalid entries: {}", report.invalid);
    }
    if report.failed > 0 {
        println!("   Failed: {}", report.failed);
    }
    if report.embedded > 0 {
        println!("   Embedded: {}", report.embedded);
    }
    if report.uncached > 0 {
        println!("   Embedded but not cached: {}", report.uncached);
    }

    Ok(())
}

/// Register a course module
#[inline]
pub async fn add_module(
    config_dir: Option<&Path>,
    title: &str,
    description: Option<String>,
) -> Result<()> {
    let (_config, database) = open(config_dir).await?;

    if let Some(existing) = database.get_module_by_title(title.trim()).await? {
        println!("Module already exists: {} (ID: {})", existing.title, existing.id);
        return Ok(());
    }

    let module = database
        .create_module(&NewCourseModule {
            title: title.trim().to_string(),
            description,
        })
        .await?;
    println!("Created module: {} (ID: {})", module.title, module.id);

    Ok(())
}

/// List course modules with their entry counts
#[inline]
pub async fn list_modules(config_dir: Option<&Path>) -> Result<()> {
    let (_config, database) = open(config_dir).await?;
    let modules = database.list_modules().await?;

    if modules.is_empty() {
        println!("No course modules yet.");
        println!("Use 'professor-rag modules add <title>' to create one.");
        return Ok(());
    }

    println!("Course Modules ({} total):", modules.len());
    println!();
    for module in &modules {
        let entries = database.list_entries_for_module(module.id).await?;
        println!("📘 {} (ID: {})", module.title, module.id);
        if let Some(description) = &module.description {
            println!("   {}", description);
        }
        println!("   Entries: {}", entries.len());
    }

    Ok(())
}

/// List knowledge entries, optionally for one module
#[inline]
pub async fn list_entries(config_dir: Option<&Path>, module_id: Option<i64>) -> Result<()> {
    let (_config, database) = open(config_dir).await?;
    let entries = match module_id {
        Some(id) => database.list_entries_for_module(id).await?,
        None => database.list_entries().await?,
    };

    if entries.is_empty() {
        println!("No knowledge entries found.");
        println!("Use 'professor-rag ingest <file>' to load a seed file.");
        return Ok(());
    }

    println!("Knowledge Entries ({} total):", entries.len());
    println!();
    for entry in &entries {
        let module = entry
            .module_id
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        let embedded = if entry.has_embedding() { "✅" } else { "⏳" };
        println!(
            "{} {} (ID: {}, module: {})",
            embedded, entry.title, entry.id, module
        );
    }

    Ok(())
}

/// Show ranked matches with their similarity scores
#[inline]
pub async fn search(
    config_dir: Option<&Path>,
    query: &str,
    module_id: Option<i64>,
    limit: Option<usize>,
    threshold: Option<f32>,
) -> Result<()> {
    let (_config, _database, professor) = open_professor(config_dir).await?;

    let results = professor
        .find_relevant_scored(query, module_id, limit, threshold)
        .await?;

    if results.is_empty() {
        let options = professor.options().with_overrides(limit, threshold);
        println!(
            "No entries scored at or above {:.2} for {:?}",
            options.threshold, query
        );
        return Ok(());
    }

    for (rank, scored) in results.iter().enumerate() {
        println!(
            "{}. {} {}",
            rank + 1,
            style(format!("[{:.3}]", scored.score)).cyan(),
            scored.entry.title
        );
    }

    Ok(())
}

/// Answer a single question
#[inline]
pub async fn ask(
    config_dir: Option<&Path>,
    question: String,
    module_id: Option<i64>,
    user: Option<String>,
    guest: bool,
) -> Result<()> {
    let (config, database, professor) = open_professor(config_dir).await?;
    bootstrap(&config, &professor, &database).await;

    let answer = professor
        .ask(AskRequest {
            question,
            module_id,
            context: request_context(user, guest),
        })
        .await;
    print_answer(&answer);

    Ok(())
}

/// Interactive question loop; an empty line or `exit` ends it
#[inline]
pub async fn chat(
    config_dir: Option<&Path>,
    module_id: Option<i64>,
    user: Option<String>,
    guest: bool,
) -> Result<()> {
    let (config, database, professor) = open_professor(config_dir).await?;
    bootstrap(&config, &professor, &database).await;

    let context = request_context(user, guest);
    eprintln!("{}", style("🎓 Ask the professor").bold().cyan());
    if context.history_user().is_none() {
        eprintln!("{}", style("Guest session: this conversation is not saved.").dim());
    }
    eprintln!("Press Enter on an empty line to leave.");
    eprintln!();

    loop {
        let question: String = Input::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()?;
        let question = question.trim();
        if question.is_empty() || question.eq_ignore_ascii_case("exit") {
            break;
        }

        let answer = professor
            .ask(AskRequest {
                question: question.to_string(),
                module_id,
                context: context.clone(),
            })
            .await;
        println!();
        print_answer(&answer);
        println!();
    }

    Ok(())
}

/// Drop every cached embedding; with `now`, recompute them immediately
#[inline]
pub async fn reembed(config_dir: Option<&Path>, now: bool) -> Result<()> {
    let (_config, database, professor) = open_professor(config_dir).await?;

    let cleared = database.clear_embeddings().await?;
    println!("Cleared {} cached embeddings", cleared);

    if !now {
        println!("Embeddings will be recomputed as entries are retrieved.");
        return Ok(());
    }

    let entries = database.list_entries().await?;
    let bar = if console::user_attended_stderr() {
        ProgressBar::new(entries.len() as u64).with_style(
            ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding {msg}")
                .context("Invalid progress template")?,
        )
    } else {
        ProgressBar::hidden()
    };

    let retriever = professor.retriever();
    let mut cached = 0_usize;
    let mut uncached = 0_usize;
    let mut failed = 0_usize;
    for entry in &entries {
        bar.set_message(entry.title.clone());
        match retriever.embed_entry(entry).await {
            Ok(computed) if computed.cached => cached += 1,
            Ok(_) => uncached += 1,
            Err(e) => {
                warn!("Failed to embed {} ({}): {}", entry.id, entry.title, e);
                failed += 1;
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    println!("Recomputed {} embeddings ({} failed)", cached, failed);
    if uncached > 0 {
        println!(
            "{} {} embeddings were not cached; check that [ollama] embedding_dimension matches the model",
            style("Warning:").yellow(),
            uncached
        );
    }

    Ok(())
}

/// Knowledge base and backend status
#[inline]
pub async fn show_status(config_dir: Option<&Path>) -> Result<()> {
    let config_dir = get_config_dir(config_dir)?;
    let config = Config::load(&config_dir).unwrap_or_else(|e| {
        warn!("Using default configuration: {:#}", e);
        Config {
            base_dir: config_dir.clone(),
            ..Config::default()
        }
    });

    println!("📊 Professor Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🗄️  Knowledge Base:");
    match Database::new(config.database_path()).await {
        Ok(database) => match database.statistics().await {
            Ok(stats) => {
                println!("   ✅ SQLite: {}", config.database_path().display());
                println!("   📚 Entries: {}", stats.total_entries);
                println!("   🔢 Embedded: {}", stats.embedded_entries);
                if stats.pending_embeddings() > 0 {
                    println!("   ⏳ Awaiting embedding: {}", stats.pending_embeddings());
                }
                println!("   📘 Modules: {}", stats.modules);
                println!("   💬 Chat exchanges: {}", stats.chat_exchanges);
            }
            Err(e) => println!("   ⚠️  SQLite: Connected but unreadable - {}", e),
        },
        Err(e) => println!("   ❌ SQLite: Failed to open - {}", e),
    }

    println!();
    println!("🤖 Embedding Backend:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Model: {}", config.ollama.model);
                println!("   📐 Dimension: {}", config.ollama.embedding_dimension);
            }
            Err(e) => println!("   ⚠️  Ollama: Unhealthy - {}", e),
        },
        Err(e) => println!("   ❌ Ollama: Failed to configure - {}", e),
    }

    println!();
    println!("✍️  Answer Generation:");
    println!("   🌐 Endpoint: {}", config.generation.base_url);
    println!("   📋 Model: {}", config.generation.model);
    if config.generation.api_key().is_some() {
        println!("   🔑 API key: set via ${}", config.generation.api_key_env);
    } else {
        println!("   ⚠️  API key: ${} is not set", config.generation.api_key_env);
    }

    println!();
    println!("🎯 Retrieval:");
    println!("   Threshold: {:.2}", config.retrieval.threshold);
    println!("   Limit: {}", config.retrieval.limit);
    println!("   History turns: {}", config.retrieval.history_turns);

    Ok(())
}
