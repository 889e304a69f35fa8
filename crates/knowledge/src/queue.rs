//! Per-project serialization of ingestion runs.

use crate::ingest::IngestPipeline;
use crate::types::{IngestOptions, IngestStats};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use triage_core::{AppError, AppResult};

/// Runs ingestions so that at most one is in flight per project key.
///
/// Runs for different projects proceed concurrently.
#[derive(Clone)]
pub struct IngestQueue {
    pipeline: Arc<IngestPipeline>,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

/// Completion handle for a submitted ingestion.
pub struct IngestHandle {
    project_key: String,
    task: JoinHandle<AppResult<IngestStats>>,
}

impl IngestHandle {
    pub fn project_key(&self) -> &str {
        &self.project_key
    }

    /// Wait for the run to finish and return its result.
    pub async fn wait(self) -> AppResult<IngestStats> {
        self.task.await.map_err(|e| {
            AppError::Other(format!(
                "Ingestion task for '{}' did not complete: {}",
                self.project_key, e
            ))
        })?
    }
}

impl IngestQueue {
    pub fn new(pipeline: Arc<IngestPipeline>) -> Self {
        Self {
            pipeline,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn lock_for(&self, project_key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(project_key.to_string()).or_default())
    }

    /// Run an ingestion now, waiting behind any run for the same project.
    pub async fn run(&self, options: IngestOptions) -> AppResult<IngestStats> {
        let lock = self.lock_for(&options.project_key).await;
        let _guard = lock.lock().await;

        tracing::debug!("Acquired ingest lock for '{}'", options.project_key);
        self.pipeline.run(&options).await
    }

    /// Start an ingestion in the background and return a handle to await it.
    pub fn submit(&self, options: IngestOptions) -> IngestHandle {
        let project_key = options.project_key.clone();
        let queue = self.clone();

        tracing::info!("Queued {} ingestion for '{}'", options.mode.as_str(), project_key);

        IngestHandle {
            project_key,
            task: tokio::spawn(async move { queue.run(options).await }),
        }
    }
}
