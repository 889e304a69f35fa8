//! Search-and-summarize orchestration.

use crate::rag::synthesize::ContextSynthesizer;
use crate::rag::types::SearchOutcome;
use crate::retrieve::{Retrieval, Retriever};

/// Retrieve the `k` nearest tickets and, if any, synthesize a solution.
///
/// Never fails: an unusable project becomes `NotIngested`, a retrieval
/// error becomes `Failed`, and generation failures are absorbed by the
/// synthesizer.
pub async fn search_and_summarize(
    retriever: &Retriever,
    synthesizer: &ContextSynthesizer,
    query: &str,
    project_key: &str,
    k: usize,
) -> SearchOutcome {
    tracing::info!("Searching '{}' for similar tickets (k={})", project_key, k);

    let results = match retriever.retrieve(query, project_key, k).await {
        Ok(Retrieval::NotIngested { reason }) => {
            return SearchOutcome::NotIngested {
                project_key: project_key.to_string(),
                reason,
            }
        }
        Ok(Retrieval::Found(results)) => results,
        Err(e) => {
            tracing::error!("Search in '{}' failed: {}", project_key, e);
            return SearchOutcome::Failed {
                project_key: project_key.to_string(),
                message: e.to_string(),
            };
        }
    };

    if results.is_empty() {
        tracing::info!("No similar tickets in '{}'", project_key);
        return SearchOutcome::NoMatches;
    }

    let solution = synthesizer.synthesize(query, &results).await;

    SearchOutcome::Answered { results, solution }
}
