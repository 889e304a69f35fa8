//! Ingest and update command handlers.

use super::{print_ingest_stats, run_ingest};
use clap::Args;
use triage_core::{config::AppConfig, AppResult};
use triage_knowledge::IngestOptions;

/// Fetch a project's tickets and rebuild its index from scratch
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Project key (e.g. OPS)
    pub project: String,

    /// Tracker query selecting the tickets
    #[arg(short, long)]
    pub query: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command for project '{}'", self.project);

        let stats = run_ingest(config, IngestOptions::replace(&self.project, &self.query)).await?;
        print_ingest_stats(&stats, self.json)
    }
}

/// Fetch a project's tickets and merge them into the existing corpus
#[derive(Args, Debug)]
pub struct UpdateCommand {
    /// Project key (e.g. OPS)
    pub project: String,

    /// Tracker query (default: tracker.updateQuery for the project)
    #[arg(short, long)]
    pub query: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl UpdateCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing update command for project '{}'", self.project);

        let query = self
            .query
            .clone()
            .unwrap_or_else(|| config.tracker.update_query_for(&self.project));
        tracing::debug!("Update query: {}", query);

        let stats = run_ingest(config, IngestOptions::merge(&self.project, query)).await?;
        print_ingest_stats(&stats, self.json)
    }
}
