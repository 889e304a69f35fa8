//! Ingestion pipeline: fetch, merge, persist, embed, index, publish.

use crate::config::{self, validate_project_key};
use crate::corpus;
use crate::embeddings::EmbeddingEngine;
use crate::lock::ProjectLock;
use crate::progress::ProgressReporter;
use crate::snapshot;
use crate::source::{fetch_all, TicketSource};
use crate::types::{IngestMode, IngestOptions, IngestStats, ProjectCorpus};
use crate::vector_index::FlatL2Index;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use triage_core::{AppError, AppResult};

/// Default tickets requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Rebuilds a project's corpus and index from a ticket source.
///
/// Steps run strictly in order and the corpus is written before embedding
/// starts, so a failure leaves the last completed step durable. Readers only
/// see the new index once the snapshot pointer moves.
pub struct IngestPipeline {
    workspace: PathBuf,
    source: Arc<dyn TicketSource>,
    embedder: Arc<EmbeddingEngine>,
    page_size: usize,
    progress: ProgressReporter,
}

impl IngestPipeline {
    pub fn new(
        workspace: impl Into<PathBuf>,
        source: Arc<dyn TicketSource>,
        embedder: Arc<EmbeddingEngine>,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            source,
            embedder,
            page_size: DEFAULT_PAGE_SIZE,
            progress: ProgressReporter::noop(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Prior corpus for merge mode. A corrupt file degrades to empty.
    fn load_prior(&self, project_key: &str) -> ProjectCorpus {
        match corpus::load_corpus(&self.workspace, project_key) {
            Ok(Some(prior)) => prior,
            Ok(None) => ProjectCorpus::empty(),
            Err(e) => {
                tracing::warn!(
                    "Persisted corpus for '{}' is unreadable, merging over an empty corpus: {}",
                    project_key,
                    e
                );
                ProjectCorpus::empty()
            }
        }
    }

    /// Run one ingestion.
    #[tracing::instrument(skip(self, options), fields(project = %options.project_key, mode = options.mode.as_str()))]
    pub async fn run(&self, options: &IngestOptions) -> AppResult<IngestStats> {
        let start = Instant::now();
        let key = options.project_key.as_str();
        validate_project_key(key)?;

        // Held until the run returns, across processes sharing the workspace
        let _lock = ProjectLock::acquire(&self.workspace, key).await?;

        let project_config = config::load_config(&self.workspace, key)?;
        project_config.embedding.validate()?;

        tracing::info!("Starting {} ingestion for '{}'", options.mode.as_str(), key);

        // Fetch
        let fetched = fetch_all(self.source.as_ref(), &options.query, self.page_size, &self.progress).await?;
        let fetched_count = fetched.len();
        let incoming = ProjectCorpus::new(fetched);

        // Merge
        let (merged, previous) = match options.mode {
            IngestMode::Replace => (incoming, 0),
            IngestMode::Merge => {
                let prior = self.load_prior(key);
                let previous = prior.len();
                (corpus::merge(&prior, &incoming), previous)
            }
        };
        self.progress
            .merge(previous as u64, fetched_count as u64, merged.len() as u64);
        tracing::info!(
            "Merged corpus for '{}': {} previous, {} fetched, {} total",
            key,
            previous,
            fetched_count,
            merged.len()
        );

        if merged.is_empty() {
            return Err(AppError::Knowledge(format!(
                "No tickets matched the query for '{}'; nothing to index",
                key
            )));
        }

        // Persist corpus
        corpus::save_corpus(&self.workspace, key, &merged)?;
        self.progress.persist(merged.len() as u64);

        // Embed
        let texts: Vec<String> = merged.iter().map(|r| r.embedding_text()).collect();
        let embedding = &project_config.embedding;
        let encoded = self.embedder.encode(embedding, &texts).await;
        // The model is only needed again at query time
        self.embedder.release(embedding).await;
        let vectors = encoded?;
        drop(texts);
        self.progress
            .embed(vectors.len() as u64, merged.len() as u64, &embedding.model);

        // Index
        let index = FlatL2Index::build(embedding.identity(), merged.ticket_ids(), vectors)?;
        self.progress.index(merged.len() as u64);

        // Publish
        let generation = snapshot::publish(&self.workspace, key, &index, &merged)?;
        self.progress.publish(generation);

        config::save_config(&self.workspace, key, &project_config)?;

        let stats = IngestStats {
            project_key: key.to_string(),
            mode: options.mode,
            fetched: fetched_count,
            previous,
            corpus_size: merged.len(),
            generation,
            duration_secs: start.elapsed().as_secs_f64(),
        };

        tracing::info!(
            "Ingestion for '{}' completed: {} tickets, generation {} in {:.2}s",
            key,
            stats.corpus_size,
            generation,
            stats.duration_secs
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fakes::FakeSource;
    use crate::types::TicketRecord;
    use tempfile::TempDir;

    fn ticket(id: &str, summary: &str) -> TicketRecord {
        TicketRecord {
            summary: summary.to_string(),
            ..TicketRecord::new(id)
        }
    }

    fn pipeline(workspace: &Path, source: Arc<FakeSource>) -> IngestPipeline {
        IngestPipeline::new(workspace, source, Arc::new(EmbeddingEngine::new())).with_page_size(2)
    }

    #[tokio::test]
    async fn test_run_publishes_aligned_snapshot() {
        let temp = TempDir::new().unwrap();
        let source = Arc::new(FakeSource::new(vec![
            ticket("OPS-1", "VPN drops"),
            ticket("OPS-2", "Disk full"),
            ticket("OPS-3", "Email bounce"),
        ]));

        let stats = pipeline(temp.path(), source)
            .run(&IngestOptions::replace("OPS", "project = OPS"))
            .await
            .unwrap();

        assert_eq!(stats.fetched, 3);
        assert_eq!(stats.corpus_size, 3);
        assert_eq!(stats.generation, 1);

        let snapshot = snapshot::load_current(temp.path(), "OPS").unwrap().unwrap();
        assert_eq!(snapshot.metadata.len(), 3);
        assert!(config::get_config_path(temp.path(), "OPS").exists());
    }

    #[tokio::test]
    async fn test_empty_fetch_keeps_previous_data() {
        let temp = TempDir::new().unwrap();
        let source = Arc::new(FakeSource::new(vec![ticket("OPS-1", "VPN drops")]));
        let pipeline = pipeline(temp.path(), source.clone());
        pipeline
            .run(&IngestOptions::replace("OPS", "q"))
            .await
            .unwrap();

        source.set_tickets(Vec::new());
        let err = pipeline
            .run(&IngestOptions::replace("OPS", "q"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Knowledge(_)));
        let persisted = corpus::load_corpus(temp.path(), "OPS").unwrap().unwrap();
        assert_eq!(persisted.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_persists_nothing() {
        let temp = TempDir::new().unwrap();
        let mut source = FakeSource::new(vec![
            ticket("OPS-1", "a"),
            ticket("OPS-2", "b"),
            ticket("OPS-3", "c"),
        ]);
        source.fail_at = Some(2);

        let err = pipeline(temp.path(), Arc::new(source))
            .run(&IngestOptions::replace("OPS", "q"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Source(_)));
        assert!(corpus::load_corpus(temp.path(), "OPS").unwrap().is_none());
        assert!(snapshot::load_current(temp.path(), "OPS").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_merge_over_corrupt_corpus_starts_empty() {
        let temp = TempDir::new().unwrap();
        let source = Arc::new(FakeSource::new(vec![
            ticket("OPS-1", "VPN drops"),
            ticket("OPS-2", "Disk full"),
        ]));
        let pipeline = pipeline(temp.path(), source.clone());
        pipeline
            .run(&IngestOptions::replace("OPS", "q"))
            .await
            .unwrap();

        std::fs::write(config::get_corpus_path(temp.path(), "OPS"), "{not json\n").unwrap();
        source.set_tickets(vec![ticket("OPS-9", "Printer offline")]);

        let stats = pipeline
            .run(&IngestOptions::merge("OPS", "q"))
            .await
            .unwrap();

        assert_eq!(stats.previous, 0);
        assert_eq!(stats.corpus_size, 1);
        let snapshot = snapshot::load_current(temp.path(), "OPS").unwrap().unwrap();
        let ids: Vec<&str> = snapshot.metadata.iter().map(|t| t.ticket_id.as_str()).collect();
        assert_eq!(ids, vec!["OPS-9"]);
        assert_eq!(corpus::load_corpus(temp.path(), "OPS").unwrap().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_project_lock_released_after_run() {
        let temp = TempDir::new().unwrap();
        let mut source = FakeSource::new(vec![ticket("OPS-1", "a"), ticket("OPS-2", "b")]);
        source.fail_at = Some(0);
        let failing = pipeline(temp.path(), Arc::new(source));

        assert!(failing.run(&IngestOptions::replace("OPS", "q")).await.is_err());
        assert!(!config::get_lock_path(temp.path(), "OPS").exists());

        let source = Arc::new(FakeSource::new(vec![ticket("OPS-1", "a")]));
        pipeline(temp.path(), source)
            .run(&IngestOptions::replace("OPS", "q"))
            .await
            .unwrap();
        assert!(!config::get_lock_path(temp.path(), "OPS").exists());
    }

    #[tokio::test]
    async fn test_invalid_project_key() {
        let temp = TempDir::new().unwrap();
        let source = Arc::new(FakeSource::new(vec![ticket("OPS-1", "a")]));

        let result = pipeline(temp.path(), source)
            .run(&IngestOptions::replace("../OPS", "q"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_embedder_released_after_run() {
        let temp = TempDir::new().unwrap();
        let engine = Arc::new(EmbeddingEngine::new());
        let source = Arc::new(FakeSource::new(vec![ticket("OPS-1", "a")]));

        IngestPipeline::new(temp.path(), source, engine.clone())
            .run(&IngestOptions::replace("OPS", "q"))
            .await
            .unwrap();

        assert_eq!(engine.loaded().await, 0);
    }
}
