//! Webhook command handler.
//!
//! Reads a tracker status-change event and, when the issue was closed,
//! runs a merge-mode ingestion for its project.

use super::{print_ingest_stats, run_ingest};
use clap::Args;
use std::io::Read;
use std::path::PathBuf;
use triage_core::{config::AppConfig, AppResult};
use triage_knowledge::{trigger, IngestOptions, TriggerDecision};

/// Handle a tracker status-change event
#[derive(Args, Debug)]
pub struct WebhookCommand {
    /// Event payload file ("-" or omitted reads stdin)
    pub payload: Option<PathBuf>,

    /// Print the decision without running the update
    #[arg(long)]
    pub dry_run: bool,
}

impl WebhookCommand {
    fn read_payload(&self) -> AppResult<Vec<u8>> {
        match &self.payload {
            Some(path) if path != std::path::Path::new("-") => Ok(std::fs::read(path)?),
            _ => {
                let mut buf = Vec::new();
                std::io::stdin().read_to_end(&mut buf)?;
                Ok(buf)
            }
        }
    }

    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing webhook command");

        let payload = self.read_payload()?;
        let decision = trigger::decide_raw(&payload, &config.tracker);
        println!("{}", serde_json::to_string_pretty(&decision)?);

        match decision {
            TriggerDecision::Update { project, query, .. } if !self.dry_run => {
                let stats = run_ingest(config, IngestOptions::merge(project, query)).await?;
                print_ingest_stats(&stats, true)
            }
            TriggerDecision::Invalid { reason } => {
                tracing::warn!("Ignoring webhook: {}", reason);
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
