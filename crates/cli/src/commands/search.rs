//! Search command handler.
//!
//! Retrieves the tickets nearest to a problem description and asks the
//! generation model for a diagnosis grounded in them.

use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use triage_core::{config::AppConfig, AppResult};
use triage_knowledge::{
    config::{load_config, DEFAULT_TOP_K},
    search_and_summarize, ContextSynthesizer, EmbeddingEngine, Retriever, SearchOutcome,
    SearchResponse,
};
use triage_llm::create_client;
use triage_prompt::{resolve_prompt, DIAGNOSIS_PROMPT_ID};

/// Find similar tickets and suggest a solution
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Project key (e.g. OPS)
    pub project: String,

    /// Description of the problem
    pub description: String,

    /// Number of similar tickets to retrieve (default: project topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command for project '{}'", self.project);

        let browse_base = config.tracker.browse_base();
        let outcome = match self.search(config, &browse_base).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Search setup failed: {}", e);
                SearchOutcome::Failed {
                    project_key: self.project.clone(),
                    message: e.to_string(),
                }
            }
        };
        let response = outcome.to_response(&browse_base);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else {
            print_response(&response);
        }

        Ok(())
    }

    async fn search(&self, config: &AppConfig, browse_base: &str) -> AppResult<SearchOutcome> {
        config.validate()?;

        let top_k = match self.top_k {
            Some(k) => k,
            None => load_config(&config.workspace, &self.project)
                .map(|c| c.top_k)
                .unwrap_or_else(|e| {
                    tracing::warn!("Using default topK: {}", e);
                    DEFAULT_TOP_K
                }),
        };

        let prompt = resolve_prompt(&config.workspace, DIAGNOSIS_PROMPT_ID)?;
        let client = create_client(
            &config.provider,
            config.endpoint.as_deref(),
            Some(Duration::from_secs(config.llm_timeout_secs)),
        )?;

        let synthesizer = ContextSynthesizer::new(client, &config.model, browse_base).with_prompt(prompt);
        let retriever = Retriever::new(config.workspace.clone(), Arc::new(EmbeddingEngine::new()));

        Ok(search_and_summarize(&retriever, &synthesizer, &self.description, &self.project, top_k).await)
    }
}

fn print_response(response: &SearchResponse) {
    println!("{}", response.message);

    if !response.similar_tickets.is_empty() {
        println!();
        println!("Similar tickets:");
        for ticket in &response.similar_tickets {
            let link = if ticket.link.is_empty() {
                String::new()
            } else {
                format!(" <{}>", ticket.link)
            };
            println!(
                "- {} [{:.4}] {}{}",
                ticket.ticket_id, ticket.distance, ticket.summary, link
            );
        }
    }

    println!();
    println!("Suggested solution:");
    println!("{}", response.solution);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn command(project: &str) -> SearchCommand {
        SearchCommand {
            project: project.to_string(),
            description: "vpn keeps dropping".to_string(),
            top_k: None,
            json: true,
        }
    }

    #[tokio::test]
    async fn test_unknown_provider_yields_error_response() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig {
            workspace: temp.path().to_path_buf(),
            provider: "bogus".to_string(),
            ..Default::default()
        };

        let err = command("OPS").search(&config, "").await.unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
        assert!(command("OPS").execute(&config).await.is_ok());
    }

    #[tokio::test]
    async fn test_never_ingested_project_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig {
            workspace: temp.path().to_path_buf(),
            ..Default::default()
        };

        let outcome = command("OPS").search(&config, "").await.unwrap();
        assert!(matches!(outcome, SearchOutcome::NotIngested { .. }));
    }
}
