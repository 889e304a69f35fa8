//! Ticket knowledge base: ingestion, retrieval and grounded answering.
//!
//! Each project key owns a corpus of tickets and a flat L2 index built from
//! their embeddings. Ingestion rebuilds both and publishes them as one
//! snapshot; retrieval reads the live snapshot and the synthesizer turns
//! the nearest tickets into a suggested diagnosis.

pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod ingest;
pub mod jira;
pub mod lock;
pub mod persist;
pub mod progress;
pub mod queue;
pub mod rag;
pub mod retrieve;
pub mod snapshot;
pub mod source;
pub mod trigger;
pub mod types;
pub mod vector_index;


// Re-export commonly used types
pub use config::ProjectConfig;
pub use embeddings::{EmbeddingConfig, EmbeddingEngine};
pub use ingest::IngestPipeline;
pub use jira::JiraSource;
pub use progress::{ProgressEvent, ProgressReporter};
pub use queue::{IngestHandle, IngestQueue};
pub use rag::{search_and_summarize, ContextSynthesizer, SearchOutcome, SearchResponse};
pub use retrieve::{Retrieval, Retriever};
pub use source::{TicketPage, TicketSource};
pub use trigger::TriggerDecision;
pub use types::{
    IngestMode, IngestOptions, IngestStats, ProjectCorpus, ProjectStats, SearchResult,
    TicketRecord,
};

use std::path::Path;
use triage_core::AppResult;

/// Remove all persisted state for a project. Returns whether anything existed.
pub fn clean(workspace: &Path, project_key: &str) -> AppResult<bool> {
    config::validate_project_key(project_key)?;
    tracing::info!("Cleaning project '{}'", project_key);
    snapshot::remove_project(workspace, project_key)
}

/// Summarize a project's persisted corpus and live snapshot.
pub fn stats(workspace: &Path, project_key: &str) -> AppResult<ProjectStats> {
    config::validate_project_key(project_key)?;

    let corpus_size = match corpus::load_corpus(workspace, project_key) {
        Ok(corpus) => corpus.map_or(0, |c| c.len()),
        Err(e) => {
            tracing::warn!("Corpus for '{}' is unreadable: {}", project_key, e);
            0
        }
    };

    let mut stats = ProjectStats {
        project_key: project_key.to_string(),
        corpus_size,
        generation: None,
        index_size: 0,
        dimensions: None,
        embedder: None,
        last_ingested_at: None,
    };

    if let Some(snapshot) = snapshot::load_current(workspace, project_key)? {
        use vector_index::VectorIndex;

        let embedder = snapshot.index.embedder();
        stats.generation = Some(snapshot.generation);
        stats.index_size = snapshot.index.len();
        stats.dimensions = Some(snapshot.index.dimensions());
        stats.embedder = Some(format!("{}/{}", embedder.provider, embedder.model));
        stats.last_ingested_at = Some(snapshot.index.built_at());
    }

    Ok(stats)
}
