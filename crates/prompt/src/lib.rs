//! Prompt system for triage.
//!
//! This crate provides:
//! - YAML-based prompt definitions with workspace overrides
//! - The built-in diagnosis prompt
//! - Handlebars template rendering

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use builtin::{diagnosis_prompt, DIAGNOSIS_PROMPT_ID};
pub use loader::{load_prompt, resolve_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
