//! Embedding engine for ticket corpora.
//!
//! Providers are created on first use, cached by configuration, and can be
//! released explicitly to reclaim memory between runs.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::{EmbedderIdentity, EmbeddingConfig};
pub use provider::{create_provider, EmbeddingProvider};

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use triage_core::{AppError, AppResult};

/// Shared embedding capability, passed by handle to the pipeline and retriever.
#[derive(Default)]
pub struct EmbeddingEngine {
    providers: RwLock<HashMap<String, Arc<dyn EmbeddingProvider>>>,
}

impl EmbeddingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or lazily create the provider for a configuration.
    async fn get_provider(&self, config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
        let key = config.cache_key();

        if let Some(provider) = self.providers.read().await.get(&key) {
            return Ok(Arc::clone(provider));
        }

        let mut providers = self.providers.write().await;
        if let Some(provider) = providers.get(&key) {
            return Ok(Arc::clone(provider));
        }

        tracing::debug!(
            "Loading embedding provider: provider={}, model={}, dimensions={}",
            config.provider,
            config.model,
            config.dimensions
        );

        let provider = create_provider(config)?;
        providers.insert(key, Arc::clone(&provider));
        Ok(provider)
    }

    /// Embed `texts`, returning one vector per text in input order.
    pub async fn encode(&self, config: &EmbeddingConfig, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let provider = self.get_provider(config).await?;

        tracing::info!(
            "Embedding {} texts using provider '{}' (model: {})",
            texts.len(),
            provider.provider_name(),
            provider.model_name()
        );

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(config.batch_size.max(1)) {
            let mut vectors = provider.embed_batch(batch).await?;
            if vectors.len() != batch.len() {
                return Err(AppError::Knowledge(format!(
                    "Embedding provider returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }
            embeddings.append(&mut vectors);
        }

        for vector in &mut embeddings {
            if vector.len() != config.dimensions {
                return Err(AppError::Knowledge(format!(
                    "Dimension mismatch: expected {}, got {}",
                    config.dimensions,
                    vector.len()
                )));
            }
            if config.normalize {
                normalize_in_place(vector);
            }
        }

        tracing::debug!(
            "Generated {} embeddings of dimension {}",
            embeddings.len(),
            config.dimensions
        );

        Ok(embeddings)
    }

    /// Embed a single query text.
    pub async fn encode_one(&self, config: &EmbeddingConfig, text: &str) -> AppResult<Vec<f32>> {
        self.encode(config, &[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| AppError::Knowledge("No embedding returned".to_string()))
    }

    /// Drop the cached provider for a configuration. Returns whether one was loaded.
    pub async fn release(&self, config: &EmbeddingConfig) -> bool {
        let released = self.providers.write().await.remove(&config.cache_key()).is_some();
        if released {
            tracing::debug!("Released embedding provider {}/{}", config.provider, config.model);
        }
        released
    }

    /// Number of providers currently loaded.
    pub async fn loaded(&self) -> usize {
        self.providers.read().await.len()
    }
}

fn normalize_in_place(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}
