//! Per-project configuration and on-disk layout.
//!
//! ```text
//! .triage/projects/<KEY>/
//!   config.yaml
//!   corpus.jsonl
//!   CURRENT
//!   snapshots/<generation>/{index.json,metadata.json}
//! ```

use crate::embeddings::EmbeddingConfig;
use crate::persist::{read_optional, write_atomic};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use triage_core::{AppError, AppResult};

/// Default number of neighbors returned by a search.
pub const DEFAULT_TOP_K: usize = 4;

/// Configuration for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Embedder used to build and query this project's index
    #[serde(flatten)]
    pub embedding: EmbeddingConfig,

    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Reject keys that are empty or contain anything besides `[A-Za-z0-9_-]`.
pub fn validate_project_key(key: &str) -> AppResult<()> {
    if key.is_empty() {
        return Err(AppError::Knowledge("Project key cannot be empty".to_string()));
    }

    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::Knowledge(format!(
            "Invalid project key '{}': only letters, digits, '_' and '-' are allowed",
            key
        )));
    }

    Ok(())
}

/// Root of all per-project state.
pub fn get_projects_dir(workspace: &Path) -> PathBuf {
    workspace.join(".triage").join("projects")
}

/// Directory for one project.
pub fn get_project_dir(workspace: &Path, project_key: &str) -> PathBuf {
    get_projects_dir(workspace).join(project_key)
}

pub fn get_config_path(workspace: &Path, project_key: &str) -> PathBuf {
    get_project_dir(workspace, project_key).join("config.yaml")
}

pub fn get_corpus_path(workspace: &Path, project_key: &str) -> PathBuf {
    get_project_dir(workspace, project_key).join("corpus.jsonl")
}

/// Pointer file naming the live snapshot generation.
pub fn get_current_path(workspace: &Path, project_key: &str) -> PathBuf {
    get_project_dir(workspace, project_key).join("CURRENT")
}

/// Exclusive lock held for the duration of an ingestion.
pub fn get_lock_path(workspace: &Path, project_key: &str) -> PathBuf {
    get_project_dir(workspace, project_key).join(".lock")
}

pub fn get_snapshots_dir(workspace: &Path, project_key: &str) -> PathBuf {
    get_project_dir(workspace, project_key).join("snapshots")
}

pub fn get_snapshot_dir(workspace: &Path, project_key: &str, generation: u64) -> PathBuf {
    get_snapshots_dir(workspace, project_key).join(generation.to_string())
}

/// Load project configuration, falling back to defaults when absent.
pub fn load_config(workspace: &Path, project_key: &str) -> AppResult<ProjectConfig> {
    let config_path = get_config_path(workspace, project_key);

    match read_optional(&config_path)? {
        Some(content) => {
            let config: ProjectConfig = serde_yaml::from_str(&content).map_err(|e| {
                AppError::Knowledge(format!(
                    "Failed to parse config at {:?}: {}",
                    config_path, e
                ))
            })?;
            tracing::debug!("Loaded project config for '{}'", project_key);
            Ok(config)
        }
        None => {
            tracing::debug!(
                "Using default project config for '{}' (no config file found)",
                project_key
            );
            Ok(ProjectConfig::default())
        }
    }
}

/// Save project configuration.
pub fn save_config(workspace: &Path, project_key: &str, config: &ProjectConfig) -> AppResult<()> {
    let config_path = get_config_path(workspace, project_key);

    let yaml = serde_yaml::to_string(config)
        .map_err(|e| AppError::Knowledge(format!("Failed to serialize config: {}", e)))?;

    write_atomic(&config_path, yaml.as_bytes())?;

    tracing::debug!("Saved project config for '{}'", project_key);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path(), "OPS").unwrap();

        assert_eq!(config.top_k, 4);
        assert_eq!(config.embedding.provider, "trigram");
        assert_eq!(config.embedding.dimensions, 384);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let mut config = ProjectConfig::default();
        config.top_k = 6;
        config.embedding.dimensions = 128;

        save_config(temp.path(), "OPS", &config).unwrap();

        let loaded = load_config(temp.path(), "OPS").unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = get_config_path(temp.path(), "OPS");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "topK: 2\ndimensions: 64\n").unwrap();

        let config = load_config(temp.path(), "OPS").unwrap();
        assert_eq!(config.top_k, 2);
        assert_eq!(config.embedding.dimensions, 64);
        assert_eq!(config.embedding.model, "trigram-v1");
    }

    #[test]
    fn test_validate_project_key() {
        assert!(validate_project_key("OPS").is_ok());
        assert!(validate_project_key("web_app-2").is_ok());
        assert!(validate_project_key("").is_err());
        assert!(validate_project_key("../etc").is_err());
        assert!(validate_project_key("A B").is_err());
    }

    #[test]
    fn test_layout_paths() {
        let ws = Path::new("/ws");
        assert_eq!(
            get_corpus_path(ws, "OPS"),
            PathBuf::from("/ws/.triage/projects/OPS/corpus.jsonl")
        );
        assert_eq!(
            get_snapshot_dir(ws, "OPS", 3),
            PathBuf::from("/ws/.triage/projects/OPS/snapshots/3")
        );
    }
}
