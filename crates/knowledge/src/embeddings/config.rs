//! Embedding configuration types.

use serde::{Deserialize, Serialize};
use triage_core::{AppError, AppResult};

/// Embedding settings for a project, stored in its `config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingConfig {
    /// Provider name: "trigram" or "ollama"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier (provider-specific)
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding vector dimensions
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Whether to normalize embeddings to unit length
    #[serde(default = "default_normalize")]
    pub normalize: bool,

    /// Maximum texts per provider request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Provider endpoint override (Ollama base URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_provider() -> String {
    "trigram".to_string()
}

fn default_model() -> String {
    "trigram-v1".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_normalize() -> bool {
    true
}

fn default_batch_size() -> usize {
    100
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            dimensions: default_dimensions(),
            normalize: default_normalize(),
            batch_size: default_batch_size(),
            endpoint: None,
        }
    }
}

/// The embedder a vector index was built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedderIdentity {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

impl std::fmt::Display for EmbedderIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} ({} dims)", self.provider, self.model, self.dimensions)
    }
}

impl EmbeddingConfig {
    pub fn identity(&self) -> EmbedderIdentity {
        EmbedderIdentity {
            provider: self.provider.clone(),
            model: self.model.clone(),
            dimensions: self.dimensions,
        }
    }

    /// Cache key for a loaded provider.
    pub(crate) fn cache_key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.provider,
            self.model,
            self.dimensions,
            self.endpoint.as_deref().unwrap_or("")
        )
    }

    /// Reject settings no provider can honor.
    pub fn validate(&self) -> AppResult<()> {
        if self.dimensions == 0 {
            return Err(AppError::Knowledge(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(AppError::Knowledge(
                "Embedding batch size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Check that an index built by `built_with` can be queried with this config.
    ///
    /// Differing dimensions are an error. A differing provider or model with
    /// matching dimensions is allowed but logged, since distances will be
    /// meaningless until the project is re-ingested.
    pub fn validate_consistency(&self, built_with: &EmbedderIdentity) -> AppResult<()> {
        if self.dimensions != built_with.dimensions {
            return Err(AppError::Knowledge(format!(
                "Dimension mismatch: index was built with {}, configured embedder produces {} dims",
                built_with, self.dimensions
            )));
        }

        if self.provider != built_with.provider || self.model != built_with.model {
            tracing::warn!(
                "Index was built with {} but the configured embedder is {}/{}; re-ingest to rebuild",
                built_with,
                self.provider,
                self.model
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "trigram");
        assert_eq!(config.model, "trigram-v1");
        assert_eq!(config.dimensions, 384);
        assert!(config.normalize);
        assert_eq!(config.batch_size, 100);
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn test_camel_case_yaml() {
        let config: EmbeddingConfig =
            serde_yaml::from_str("provider: ollama\nmodel: nomic-embed-text\ndimensions: 768\nbatchSize: 16\n")
                .unwrap();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.batch_size, 16);
        assert!(config.normalize);
    }

    #[test]
    fn test_validate_consistency_success() {
        let config = EmbeddingConfig::default();
        assert!(config.validate_consistency(&config.identity()).is_ok());
    }

    #[test]
    fn test_validate_consistency_model_mismatch_is_allowed() {
        let config = EmbeddingConfig::default();
        let built_with = EmbedderIdentity {
            model: "trigram-v0".to_string(),
            ..config.identity()
        };
        assert!(config.validate_consistency(&built_with).is_ok());
    }

    #[test]
    fn test_validate_consistency_dimension_mismatch() {
        let config = EmbeddingConfig::default();
        let built_with = EmbedderIdentity {
            dimensions: 768,
            ..config.identity()
        };

        let result = config.validate_consistency(&built_with);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Dimension mismatch"));
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let config = EmbeddingConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
