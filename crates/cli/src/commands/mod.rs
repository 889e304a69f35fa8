//! Command handlers for the triage CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod clean;
pub mod ingest;
pub mod search;
pub mod stats;
pub mod webhook;

// Re-export command types for convenience
pub use clean::CleanCommand;
pub use ingest::{IngestCommand, UpdateCommand};
pub use search::SearchCommand;
pub use stats::StatsCommand;
pub use webhook::WebhookCommand;

use std::sync::Arc;
use triage_core::{config::AppConfig, AppResult};
use triage_knowledge::{
    EmbeddingEngine, IngestOptions, IngestQueue, IngestStats, JiraSource, IngestPipeline,
    ProgressEvent, ProgressReporter,
};

/// Progress reporter printing phase updates to stderr.
fn stderr_progress() -> ProgressReporter {
    ProgressReporter::new(Arc::new(|event: ProgressEvent| {
        eprintln!("{}", event.format_simple());
    }))
}

/// Run one ingestion against the configured tracker, serialized per project.
pub(crate) async fn run_ingest(config: &AppConfig, options: IngestOptions) -> AppResult<IngestStats> {
    config.validate()?;
    config.validate_tracker()?;
    let credentials = config.resolve_tracker_credentials()?;
    let source = JiraSource::new(&config.tracker, credentials)?;

    let pipeline = IngestPipeline::new(
        config.workspace.clone(),
        Arc::new(source),
        Arc::new(EmbeddingEngine::new()),
    )
    .with_page_size(config.tracker.page_size as usize)
    .with_progress(stderr_progress());

    IngestQueue::new(Arc::new(pipeline)).run(options).await
}

/// Print ingestion results as text or JSON.
pub(crate) fn print_ingest_stats(stats: &IngestStats, json: bool) -> AppResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(stats)?);
    } else {
        println!(
            "Ingested '{}' ({}): {} fetched, {} previous, {} in corpus, generation {} in {:.2}s",
            stats.project_key,
            stats.mode.as_str(),
            stats.fetched,
            stats.previous,
            stats.corpus_size,
            stats.generation,
            stats.duration_secs
        );
    }
    Ok(())
}
