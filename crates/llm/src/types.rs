//! Generation configuration types.

use serde::{Deserialize, Serialize};

/// Sampling and length settings for a single completion.
///
/// The defaults favor short, factual answers: a bounded output and a low
/// temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    /// Upper bound on generated tokens
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling cutoff
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Sequences that end generation early
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

fn default_max_output_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.3
}

fn default_top_p() -> f32 {
    1.0
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            stop_sequences: Vec::new(),
        }
    }
}

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!(ProviderType::parse("ollama"), Some(ProviderType::Ollama));
        assert_eq!(ProviderType::parse("OLLAMA"), Some(ProviderType::Ollama));
        assert_eq!(ProviderType::parse("unknown"), None);
        assert_eq!(ProviderType::Ollama.as_str(), "ollama");
    }

    #[test]
    fn test_default_params() {
        let params = GenerationParams::default();
        assert_eq!(params.max_output_tokens, 500);
        assert_eq!(params.temperature, 0.3);
        assert_eq!(params.top_p, 1.0);
        assert!(params.stop_sequences.is_empty());
    }

    #[test]
    fn test_params_partial_json() {
        let params: GenerationParams = serde_json::from_str(r#"{"maxOutputTokens": 800}"#).unwrap();
        assert_eq!(params.max_output_tokens, 800);
        assert_eq!(params.temperature, 0.3);
    }
}
