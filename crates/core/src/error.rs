//! Error types for the triage workspace.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: configuration, I/O, the ticket source, the generation
//! capability, persisted artifacts, prompts and the retrieval core.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for the triage workspace.
///
/// All fallible functions return `Result<T, AppError>`.
/// A project that was never ingested is not an error; it is reported through
/// the retrieval and search outcome types instead.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ticket source unreachable or returned a non-success status
    #[error("Ticket source unavailable: {0}")]
    Source(String),

    /// Generation or embedding model errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// A persisted corpus, index or metadata file failed to parse or validate
    #[error("Corrupt artifact {path:?}: {reason}")]
    CorruptArtifact { path: PathBuf, reason: String },

    /// Ingestion and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Build a `CorruptArtifact` error for `path`.
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        AppError::CorruptArtifact {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
