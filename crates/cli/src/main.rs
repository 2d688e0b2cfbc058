//! Lexora CLI
//!
//! Upload documents, keep the vector index in step with them and ask
//! questions answered from their content.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, DeleteCommand, ListCommand, ReindexCommand, StatsCommand, UploadCommand};
use lexora_core::{
    config::AppConfig,
    logging::{self, LogFormat},
    AppResult,
};
use lexora_knowledge::{ProgressEvent, ProgressReporter, RagEngine};
use std::path::PathBuf;
use std::sync::Arc;

/// Lexora - question answering over your own documents
#[derive(Parser, Debug)]
#[command(name = "lexora")]
#[command(about = "Question answering over your own documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "LEXORA_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "LEXORA_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Generation provider (ollama)
    #[arg(short, long, global = true, env = "LEXORA_PROVIDER")]
    provider: Option<String>,

    /// Generation model identifier
    #[arg(short, long, global = true, env = "LEXORA_MODEL")]
    model: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a document and index it
    Upload(UploadCommand),

    /// List uploaded documents
    List(ListCommand),

    /// Delete a document and rebuild the index
    Delete(DeleteCommand),

    /// Ask a question about the uploaded documents
    Ask(AskCommand),

    /// Rebuild the index from every uploaded document
    Reindex(ReindexCommand),

    /// Show index statistics
    Stats(StatsCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Upload(_) => "upload",
            Commands::List(_) => "list",
            Commands::Delete(_) => "delete",
            Commands::Ask(_) => "ask",
            Commands::Reindex(_) => "reindex",
            Commands::Stats(_) => "stats",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // The workspace and config file decide which yaml gets merged
    let config = AppConfig::load_for(cli.workspace.clone(), cli.config.clone())?;

    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.log_json,
    );
    config.validate()?;

    let format = if config.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    logging::init_logging(config.log_level.as_deref(), config.no_color, format)?;

    tracing::info!("Lexora CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_state_dir()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let engine = Arc::new(
        RagEngine::from_app_config(&config)
            .await?
            .with_progress(stderr_progress()),
    );
    let status = engine.init().await?;
    tracing::debug!(?status, "Engine initialized");

    let result = match cli.command {
        Commands::Upload(cmd) => cmd.execute(&engine).await,
        Commands::List(cmd) => cmd.execute(&engine).await,
        Commands::Delete(cmd) => cmd.execute(&engine).await,
        Commands::Ask(cmd) => cmd.execute(&engine).await,
        Commands::Reindex(cmd) => cmd.execute(&engine).await,
        Commands::Stats(cmd) => cmd.execute(&engine).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

/// Progress lines go to stderr so stdout stays clean for answers and JSON.
fn stderr_progress() -> ProgressReporter {
    ProgressReporter::new(Arc::new(|event: ProgressEvent| eprintln!("{}", event.format_simple())))
}
