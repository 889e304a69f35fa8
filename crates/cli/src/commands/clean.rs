//! Clean command handler.

use clap::Args;
use triage_core::{config::AppConfig, AppResult};

/// Remove a project's corpus, index and snapshots
#[derive(Args, Debug)]
pub struct CleanCommand {
    /// Project key (e.g. OPS)
    pub project: String,
}

impl CleanCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing clean command for project '{}'", self.project);

        if triage_knowledge::clean(&config.workspace, &self.project)? {
            println!("Project '{}' cleaned", self.project);
        } else {
            println!("Project '{}' has no stored data", self.project);
        }

        Ok(())
    }
}
