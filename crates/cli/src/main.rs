//! Triage CLI
//!
//! Main entry point for the triage command-line tool.
//! Ingests support tickets per project and answers new problem reports
//! with similar past tickets and a suggested diagnosis.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    CleanCommand, IngestCommand, SearchCommand, StatsCommand, UpdateCommand, WebhookCommand,
};
use std::path::PathBuf;
use triage_core::{config::AppConfig, logging, AppResult};

/// Triage - retrieval-augmented diagnosis over your ticket history
#[derive(Parser, Debug)]
#[command(name = "triage")]
#[command(about = "Retrieval-augmented diagnosis over a support-ticket corpus", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "TRIAGE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "TRIAGE_CONFIG")]
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
    #[arg(short, long, global = true, env = "TRIAGE_PROVIDER")]
    provider: Option<String>,

    /// Generation model identifier
    #[arg(short, long, global = true, env = "TRIAGE_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replace a project's corpus with freshly fetched tickets
    Ingest(IngestCommand),

    /// Merge freshly fetched tickets into a project's corpus
    Update(UpdateCommand),

    /// Handle a tracker status-change event
    Webhook(WebhookCommand),

    /// Find similar tickets and suggest a solution
    Search(SearchCommand),

    /// Show project statistics
    Stats(StatsCommand),

    /// Remove a project's stored data
    Clean(CleanCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ingest(_) => "ingest",
            Commands::Update(_) => "update",
            Commands::Webhook(_) => "webhook",
            Commands::Search(_) => "search",
            Commands::Stats(_) => "stats",
            Commands::Clean(_) => "clean",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load()?.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Triage CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_triage_dir()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match &cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Update(cmd) => cmd.execute(&config).await,
        Commands::Webhook(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Clean(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search() {
        let cli = Cli::try_parse_from(["triage", "search", "OPS", "vpn keeps dropping", "-k", "2", "--json"])
            .unwrap();
        let Commands::Search(cmd) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(cmd.project, "OPS");
        assert_eq!(cmd.top_k, Some(2));
        assert!(cmd.json);
    }

    #[test]
    fn test_ingest_requires_query() {
        assert!(Cli::try_parse_from(["triage", "ingest", "OPS"]).is_err());
        let cli = Cli::try_parse_from(["triage", "update", "OPS"]).unwrap();
        assert_eq!(cli.command.name(), "update");
    }
}
