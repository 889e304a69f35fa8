//! LLM provider factory.
//!
//! Creates the generation client once at startup; the resulting handle is
//! shared by every component that needs completions.

use crate::client::LlmClient;
use crate::providers::{ollama::DEFAULT_OLLAMA_URL, OllamaClient};
use crate::types::ProviderType;
use std::sync::Arc;
use std::time::Duration;
use triage_core::{AppError, AppResult};

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `timeout` - Optional per-request timeout
///
/// # Errors
/// Returns an error if the provider is unknown or the HTTP client cannot be built.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    timeout: Option<Duration>,
) -> AppResult<Arc<dyn LlmClient>> {
    match ProviderType::parse(provider) {
        Some(ProviderType::Ollama) => {
            let base_url = endpoint.unwrap_or(DEFAULT_OLLAMA_URL);
            let client = match timeout {
                Some(timeout) => OllamaClient::with_timeout(base_url, timeout)?,
                None => OllamaClient::with_base_url(base_url),
            };
            Ok(Arc::new(client))
        }
        None => Err(AppError::Config(format!("Unknown provider: {}", provider))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_timeout() {
        let client = create_client(
            "ollama",
            Some("http://localhost:8080"),
            Some(Duration::from_secs(5)),
        );
        assert!(client.is_ok());
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None) {
            Err(AppError::Config(msg)) => assert!(msg.contains("Unknown provider")),
            Err(other) => panic!("Expected a config error, got {}", other),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
