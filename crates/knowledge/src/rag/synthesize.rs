//! Context synthesizer: bounded ticket context plus one generation call.

use crate::types::SearchResult;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use triage_core::AppResult;
use triage_llm::{GenerationParams, LlmClient, LlmRequest};
use triage_prompt::{build_prompt, diagnosis_prompt, BuiltPrompt, PromptDefinition};

/// Returned whenever generation fails.
pub const FALLBACK_SOLUTION: &str = "Sorry, I could not generate a solution at this time.";

/// Tickets included in the prompt context, regardless of how many were retrieved.
pub const MAX_CONTEXT_TICKETS: usize = 3;

/// Browse link for a ticket. With an empty base the bare id is returned.
pub fn ticket_link(browse_base: &str, ticket_id: &str) -> String {
    format!("{}{}", browse_base, ticket_id)
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        "N/A"
    } else {
        value
    }
}

/// Builds the diagnosis prompt and calls the generation capability.
pub struct ContextSynthesizer {
    client: Arc<dyn LlmClient>,
    model: String,
    params: GenerationParams,
    prompt: PromptDefinition,
    browse_base: String,
}

impl ContextSynthesizer {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, browse_base: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            params: GenerationParams::default(),
            prompt: diagnosis_prompt(),
            browse_base: browse_base.into(),
        }
    }

    /// Use a different prompt definition (e.g. a workspace override).
    pub fn with_prompt(mut self, prompt: PromptDefinition) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn browse_base(&self) -> &str {
        &self.browse_base
    }

    /// Context block for the first [`MAX_CONTEXT_TICKETS`] results.
    pub fn build_context(&self, results: &[SearchResult]) -> String {
        let mut context = String::new();

        for result in results.iter().take(MAX_CONTEXT_TICKETS) {
            let ticket = &result.ticket;
            context.push_str(&format!(
                "Ticket ID: {} (Link: {})\nSummary: {}\nDescription: {}\nRoot cause: {}\nResolution: {}\nComments: {}\n---\n",
                ticket.ticket_id,
                ticket_link(&self.browse_base, &ticket.ticket_id),
                ticket.summary,
                ticket.description,
                ticket.root_cause,
                or_na(&ticket.resolution),
                ticket.comments,
            ));
        }

        context
    }

    /// Render the prompt for `query` and `results`.
    pub fn build_prompt(&self, query: &str, results: &[SearchResult]) -> AppResult<BuiltPrompt> {
        let mut variables = HashMap::new();
        variables.insert("query".to_string(), query.to_string());
        variables.insert("context".to_string(), self.build_context(results));
        variables.insert(
            "currentDate".to_string(),
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );

        build_prompt(&self.prompt, variables)
    }

    async fn generate(&self, query: &str, results: &[SearchResult]) -> AppResult<String> {
        let built = self.build_prompt(query, results)?;

        let mut request = LlmRequest::new(built.user, self.model.clone()).with_params(&self.params);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let response = self.client.complete(&request).await?;
        Ok(response.content.trim().to_string())
    }

    /// Produce a suggested solution. Never fails: any error yields [`FALLBACK_SOLUTION`].
    #[tracing::instrument(skip_all, fields(provider = self.client.provider_name(), tickets = results.len()))]
    pub async fn synthesize(&self, query: &str, results: &[SearchResult]) -> String {
        match self.generate(query, results).await {
            Ok(solution) if !solution.is_empty() => solution,
            Ok(_) => {
                tracing::warn!("Generation returned an empty completion");
                FALLBACK_SOLUTION.to_string()
            }
            Err(e) => {
                tracing::warn!("Generation failed, using fallback solution: {}", e);
                FALLBACK_SOLUTION.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::fakes::FakeLlm;
    use crate::types::TicketRecord;

    const BROWSE: &str = "https://example.atlassian.net/browse/";

    fn result(id: &str, resolution: &str) -> SearchResult {
        SearchResult {
            ticket: TicketRecord {
                summary: format!("summary {}", id),
                description: format!("description {}", id),
                root_cause: "cache eviction".to_string(),
                resolution: resolution.to_string(),
                comments: "restarted | fixed".to_string(),
                ..TicketRecord::new(id)
            },
            distance: 0.5,
        }
    }

    #[test]
    fn test_context_uses_first_three_results() {
        let synthesizer = ContextSynthesizer::new(Arc::new(FakeLlm::answering("ok")), "llama3.2", BROWSE);
        let results: Vec<SearchResult> = (1..=4).map(|i| result(&format!("OPS-{}", i), "Fixed")).collect();

        let context = synthesizer.build_context(&results);

        assert!(context.contains("Ticket ID: OPS-1 (Link: https://example.atlassian.net/browse/OPS-1)"));
        assert!(context.contains("OPS-3"));
        assert!(!context.contains("OPS-4"));
        assert_eq!(context.matches("---\n").count(), 3);
    }

    #[test]
    fn test_context_marks_missing_resolution() {
        let synthesizer = ContextSynthesizer::new(Arc::new(FakeLlm::answering("ok")), "llama3.2", BROWSE);
        let context = synthesizer.build_context(&[result("OPS-1", "")]);

        assert!(context.contains("Resolution: N/A\n"));
        assert!(context.contains("Root cause: cache eviction\n"));
        assert!(context.contains("Comments: restarted | fixed\n"));
    }

    #[test]
    fn test_prompt_embeds_query_and_context() {
        let synthesizer = ContextSynthesizer::new(Arc::new(FakeLlm::answering("ok")), "llama3.2", BROWSE);
        let built = synthesizer
            .build_prompt("Checkout page is blank", &[result("OPS-9", "Fixed")])
            .unwrap();

        assert!(built.user.contains("Checkout page is blank"));
        assert!(built.user.contains("Ticket ID: OPS-9"));
        assert!(built.user.contains(" UTC"));
    }

    #[tokio::test]
    async fn test_synthesize_sends_bounded_low_temperature_request() {
        let llm = Arc::new(FakeLlm::answering("  Check the cache.  "));
        let synthesizer = ContextSynthesizer::new(llm.clone(), "llama3.2", BROWSE);

        let solution = synthesizer.synthesize("Slow pages", &[result("OPS-1", "Fixed")]).await;
        assert_eq!(solution, "Check the cache.");

        let request = llm.last_request().unwrap();
        assert_eq!(request.model, "llama3.2");
        assert_eq!(request.max_tokens, Some(500));
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.top_p, Some(1.0));
        assert!(request.stop.is_empty());
    }

    #[tokio::test]
    async fn test_synthesize_falls_back_on_failure() {
        let synthesizer = ContextSynthesizer::new(Arc::new(FakeLlm::failing()), "llama3.2", BROWSE);
        let solution = synthesizer.synthesize("Slow pages", &[result("OPS-1", "Fixed")]).await;
        assert_eq!(solution, FALLBACK_SOLUTION);
    }

    #[tokio::test]
    async fn test_synthesize_falls_back_on_bad_template() {
        let mut prompt = diagnosis_prompt();
        prompt.template = "{{#if}}".to_string();
        let synthesizer =
            ContextSynthesizer::new(Arc::new(FakeLlm::answering("ok")), "llama3.2", BROWSE).with_prompt(prompt);

        assert_eq!(synthesizer.synthesize("q", &[]).await, FALLBACK_SOLUTION);
    }

    #[test]
    fn test_ticket_link() {
        assert_eq!(ticket_link(BROWSE, "OPS-1"), "https://example.atlassian.net/browse/OPS-1");
        assert_eq!(ticket_link("", "OPS-1"), "OPS-1");
    }
}
