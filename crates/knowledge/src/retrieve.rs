//! Retrieval engine: query embedding plus nearest-neighbor lookup.

use crate::config::{self, validate_project_key, ProjectConfig};
use crate::embeddings::EmbeddingEngine;
use crate::snapshot::{self, Snapshot};
use crate::types::SearchResult;
use crate::vector_index::VectorIndex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use triage_core::{AppError, AppResult};

/// Outcome of a retrieval.
#[derive(Debug, Clone)]
pub enum Retrieval {
    /// No usable snapshot for the project; `reason` is set when one exists but is corrupt
    NotIngested { reason: Option<String> },

    /// Nearest tickets, closest first (may be empty)
    Found(Vec<SearchResult>),
}

struct LoadedProject {
    snapshot: Snapshot,
    config: ProjectConfig,
}

/// Loads project snapshots lazily and answers nearest-ticket queries.
pub struct Retriever {
    workspace: PathBuf,
    embedder: Arc<EmbeddingEngine>,
    loaded: RwLock<HashMap<String, Arc<LoadedProject>>>,
}

enum Lookup {
    Ready(Arc<LoadedProject>),
    Missing(Option<String>),
}

impl Retriever {
    pub fn new(workspace: impl Into<PathBuf>, embedder: Arc<EmbeddingEngine>) -> Self {
        Self {
            workspace: workspace.into(),
            embedder,
            loaded: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve the live snapshot, reusing the cached one while `CURRENT` is unchanged.
    async fn project(&self, project_key: &str) -> AppResult<Lookup> {
        let generation = match snapshot::current_generation(&self.workspace, project_key) {
            Ok(Some(generation)) => generation,
            Ok(None) => return Ok(Lookup::Missing(None)),
            Err(AppError::CorruptArtifact { path, reason }) => {
                tracing::error!("Snapshot pointer {:?} is corrupt: {}", path, reason);
                return Ok(Lookup::Missing(Some(reason)));
            }
            Err(e) => return Err(e),
        };

        if let Some(project) = self.loaded.read().await.get(project_key) {
            if project.snapshot.generation == generation {
                return Ok(Lookup::Ready(Arc::clone(project)));
            }
        }

        let snapshot = match snapshot::load_current(&self.workspace, project_key) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return Ok(Lookup::Missing(None)),
            Err(AppError::CorruptArtifact { path, reason }) => {
                tracing::error!("Snapshot for '{}' is corrupt ({:?}): {}", project_key, path, reason);
                return Ok(Lookup::Missing(Some(reason)));
            }
            Err(e) => return Err(e),
        };

        let config = config::load_config(&self.workspace, project_key)?;
        let project = Arc::new(LoadedProject { snapshot, config });

        self.loaded
            .write()
            .await
            .insert(project_key.to_string(), Arc::clone(&project));

        tracing::debug!(
            "Loaded snapshot generation {} for '{}'",
            project.snapshot.generation,
            project_key
        );
        Ok(Lookup::Ready(project))
    }

    /// Return up to `k` tickets nearest to `query`.
    #[tracing::instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn retrieve(&self, query: &str, project_key: &str, k: usize) -> AppResult<Retrieval> {
        validate_project_key(project_key)?;

        let project = match self.project(project_key).await? {
            Lookup::Ready(project) => project,
            Lookup::Missing(reason) => {
                tracing::info!("Project '{}' has not been ingested", project_key);
                return Ok(Retrieval::NotIngested { reason });
            }
        };

        let embedding = &project.config.embedding;
        embedding.validate_consistency(project.snapshot.index.embedder())?;

        let encoded = self.embedder.encode_one(embedding, query).await;
        self.embedder.release(embedding).await;
        let query_vector = encoded?;

        let metadata = &project.snapshot.metadata;
        let results: Vec<SearchResult> = project
            .snapshot
            .index
            .search(&query_vector, k)?
            .into_iter()
            .filter(|(pos, _)| *pos < metadata.len())
            .map(|(pos, distance)| SearchResult {
                ticket: metadata[pos].clone(),
                distance,
            })
            .collect();

        tracing::info!(
            "Retrieved {} tickets for '{}' (nearest distance: {:?})",
            results.len(),
            project_key,
            results.first().map(|r| r.distance)
        );

        Ok(Retrieval::Found(results))
    }
}
