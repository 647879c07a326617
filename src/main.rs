use clap::{Parser, Subcommand};
use professor_rag::Result;
use professor_rag::commands::{
    add_module, ask, chat, ingest_file, list_entries, list_modules, reembed, search, show_status,
};
use professor_rag::config::{get_config_dir, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "professor-rag")]
#[command(about = "A course-aware AI professor backed by a semantic knowledge base")]
#[command(version)]
struct Cli {
    /// Configuration directory (defaults to ~/.professor-rag)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding and generation backends
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Manage course modules
    Modules {
        #[command(subcommand)]
        action: ModuleAction,
    },
    /// Ingest knowledge entries from a TOML seed file
    Ingest {
        /// Path to the seed file
        file: PathBuf,
    },
    /// List knowledge entries
    List {
        /// Only entries of this module
        #[arg(long)]
        module: Option<i64>,
    },
    /// Show the entries a question would be grounded on, with scores
    Search {
        query: String,
        #[arg(long)]
        module: Option<i64>,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
        /// Minimum cosine similarity
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Ask a single question
    Ask {
        question: String,
        #[arg(long)]
        module: Option<i64>,
        /// Student identifier used for conversation history
        #[arg(long)]
        user: Option<String>,
        /// Answer without reading or saving conversation history
        #[arg(long)]
        guest: bool,
    },
    /// Start an interactive chat session
    Chat {
        #[arg(long)]
        module: Option<i64>,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        guest: bool,
    },
    /// Discard cached embeddings, e.g. after changing the embedding model
    Reembed {
        /// Recompute every embedding immediately
        #[arg(long)]
        now: bool,
    },
    /// Show knowledge base and backend status
    Status,
}

#[derive(Subcommand)]
enum ModuleAction {
    /// Create a course module
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List course modules
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config_dir = cli.config_dir.as_deref();

    match cli.command {
        Commands::Config { show } => {
            let dir = get_config_dir(config_dir)?;
            if show {
                show_config(&dir)?;
            } else {
                run_interactive_config(&dir)?;
            }
        }
        Commands::Modules { action } => match action {
            ModuleAction::Add { title, description } => {
                add_module(config_dir, &title, description).await?;
            }
            ModuleAction::List => {
                list_modules(config_dir).await?;
            }
        },
        Commands::Ingest { file } => {
            ingest_file(config_dir, &file).await?;
        }
        Commands::List { module } => {
            list_entries(config_dir, module).await?;
        }
        Commands::Search {
            query,
            module,
            limit,
            threshold,
        } => {
            search(config_dir, &query, module, limit, threshold).await?;
        }
        Commands::Ask {
            question,
            module,
            user,
            guest,
        } => {
            ask(config_dir, question, module, user, guest).await?;
        }
        Commands::Chat {
            module,
            user,
            guest,
        } => {
            chat(config_dir, module, user, guest).await?;
        }
        Commands::Reembed { now } => {
            reembed(config_dir, now).await?;
        }
        Commands::Status => {
            show_status(config_dir).await?;
        }
    }

    Ok(())
}
