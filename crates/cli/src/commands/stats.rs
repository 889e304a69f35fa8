//! Stats command handler.

use clap::Args;
use triage_core::{config::AppConfig, AppResult};

/// Show a project's corpus and snapshot statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Project key (e.g. OPS)
    pub project: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command for project '{}'", self.project);

        let stats = triage_knowledge::stats(&config.workspace, &self.project)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
            return Ok(());
        }

        println!("Project: {}", stats.project_key);
        println!("Corpus size: {}", stats.corpus_size);
        match stats.generation {
            Some(generation) => {
                println!("Snapshot generation: {}", generation);
                println!("Index size: {}", stats.index_size);
                if let Some(dimensions) = stats.dimensions {
                    println!("Dimensions: {}", dimensions);
                }
                if let Some(embedder) = &stats.embedder {
                    println!("Embedder: {}", embedder);
                }
                if let Some(at) = stats.last_ingested_at {
                    println!("Last ingested: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
                }
            }
            None => println!("Snapshot: not ingested"),
        }

        Ok(())
    }
}
