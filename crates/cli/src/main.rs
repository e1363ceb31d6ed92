//! docqa CLI
//!
//! Main entry point for the docqa command-line tool.
//! Answers questions from an extracted document corpus with a local model.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, CorpusCommand};
use docqa_core::config::{AppConfig, ConfigOverrides};
use docqa_core::{logging, AppResult};
use std::path::PathBuf;

/// docqa - grounded question answering over your documents
#[derive(Parser, Debug)]
#[command(name = "docqa")]
#[command(about = "Grounded question answering over your documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "DOCQA_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "DOCQA_CONFIG")]
    config: Option<PathBuf>,

    /// Corpus JSON file (default: data.json in the workspace)
    #[arg(long, global = true, env = "DOCQA_CORPUS")]
    corpus: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Text-generation provider
    #[arg(short, long, global = true, env = "DOCQA_PROVIDER")]
    provider: Option<String>,

    /// Text-generation model identifier
    #[arg(short, long, global = true, env = "DOCQA_MODEL")]
    model: Option<String>,

    /// Embedding provider (ollama, trigram)
    #[arg(long, global = true, env = "DOCQA_EMBEDDING_PROVIDER")]
    embedding_provider: Option<String>,

    /// Embedding model identifier
    #[arg(long, global = true, env = "DOCQA_EMBEDDING_MODEL")]
    embedding_model: Option<String>,

    /// Number of passages to retrieve
    #[arg(short = 'k', long, global = true)]
    top_k: Option<usize>,

    /// Minimum similarity for a passage to count as relevant
    #[arg(long, global = true)]
    threshold: Option<f32>,

    /// Target passage size in characters
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer one question and exit
    Ask(AskCommand),

    /// Ask questions interactively
    Chat(ChatCommand),

    /// Inspect the document corpus
    Corpus(CorpusCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Defaults, config file and environment
    let config = AppConfig::load(cli.workspace, cli.config)?;

    // Apply CLI overrides
    let config = config.with_overrides(ConfigOverrides {
        corpus: cli.corpus,
        provider: cli.provider,
        model: cli.model,
        embedding_provider: cli.embedding_provider,
        embedding_model: cli.embedding_model,
        top_k: cli.top_k,
        threshold: cli.threshold,
        chunk_size: cli.chunk_size,
        log_level: cli.log_level,
        verbose: cli.verbose,
        no_color: cli.no_color,
    });

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_format)?;

    config.validate()?;

    tracing::info!("docqa starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Corpus: {:?}", config.corpus_file());
    tracing::debug!(
        "LLM: {} ({}), embeddings: {} ({})",
        config.llm.provider,
        config.llm.model,
        config.embedding.provider,
        config.embedding.model
    );

    // Emit command span
    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Corpus(_) => "corpus",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Corpus(cmd) => cmd.execute(&config).await,
    };

    // Log completion
    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
