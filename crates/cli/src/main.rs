//! Docu Assistant CLI
//!
//! Chat with your PDFs, in the browser (`docu serve`) or in the terminal
//! (`docu ask`).

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ServeCommand};
use docu_core::{config::AppConfig, logging};
use std::path::PathBuf;
use tracing::Instrument;

/// Docu Assistant - ask questions about your PDF documents
#[derive(Parser, Debug)]
#[command(name = "docu")]
#[command(about = "Ask questions about your PDF documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "DOCU_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "DOCU_CONFIG")]
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

    /// Chat provider (openai, ollama)
    #[arg(short, long, global = true, env = "DOCU_PROVIDER")]
    provider: Option<String>,

    /// Chat model identifier
    #[arg(short, long, global = true, env = "DOCU_MODEL")]
    model: Option<String>,

    /// Embedding provider (openai, ollama, trigram)
    #[arg(long, global = true, env = "DOCU_EMBEDDING_PROVIDER")]
    embedding_provider: Option<String>,

    /// Address for the web UI
    #[arg(long, global = true, env = "DOCU_BIND")]
    bind: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the browser UI
    Serve(ServeCommand),

    /// Train on local PDFs and ask questions in the terminal
    Ask(AskCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Credentials may live in a local .env file; load it before clap reads env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.workspace, cli.config)?.with_overrides(
        cli.provider,
        cli.model,
        cli.embedding_provider,
        cli.bind,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Docu Assistant starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {} ({})", config.provider, config.model);
    tracing::debug!(
        "Embeddings: {} ({})",
        config.embedding_provider,
        config.resolved_embedding_model()
    );

    config.validate()?;

    let command_name = match &cli.command {
        Commands::Serve(_) => "serve",
        Commands::Ask(_) => "ask",
    };
    let span = tracing::info_span!("command", name = command_name);

    let result = async {
        match cli.command {
            Commands::Serve(cmd) => cmd.execute(&config).await,
            Commands::Ask(cmd) => cmd.execute(&config).await,
        }
    }
    .instrument(span)
    .await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    Ok(result?)
}
