//! ConvoPilot CLI
//!
//! Answers questions about a folder of documents using a local semantic index.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, CleanCommand, IndexCommand, StatsCommand};
use convopilot_core::{
    config::AppConfig,
    logging::{self, LogFormat},
    AppResult,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// ConvoPilot - ask questions about your documents
#[derive(Parser, Debug)]
#[command(name = "convopilot")]
#[command(about = "Ask questions about your documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "CONVOPILOT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "CONVOPILOT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory containing the documents to index
    #[arg(long, global = true, env = "CONVOPILOT_SOURCE_DIR")]
    source_dir: Option<PathBuf>,

    /// Embedding provider (trigram, ollama)
    #[arg(short, long, global = true, env = "CONVOPILOT_EMBEDDING_PROVIDER")]
    embedding_provider: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rebuild the document index
    Index(IndexCommand),

    /// Ask a question about the documents
    Ask(AskCommand),

    /// Show index statistics
    Stats(StatsCommand),

    /// Delete the persisted index
    Clean(CleanCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    // Workspace and config file decide which YAML is read, so they go first
    let config = AppConfig::load_from(cli.workspace.clone(), cli.config.clone())?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.source_dir,
        cli.embedding_provider,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.json_logs,
    );

    let format = if config.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    logging::init_logging(config.log_level.as_deref(), config.no_color, format)?;

    tracing::info!("ConvoPilot CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Source directory: {:?}", config.resolved_source_dir());

    config.validate()?;
    config.ensure_state_dir()?;

    let command_name = match &cli.command {
        Commands::Index(_) => "index",
        Commands::Ask(_) => "ask",
        Commands::Stats(_) => "stats",
        Commands::Clean(_) => "clean",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Index(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Clean(cmd) => cmd.execute(&config).await,
    };

    if result.is_ok() {
        tracing::info!("Command completed successfully");
    }

    result
}
