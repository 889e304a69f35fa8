//! Search outcome and response types.

use crate::rag::synthesize::ticket_link;
use crate::types::SearchResult;
use serde::{Deserialize, Serialize};

/// Solution text when the project has no usable snapshot.
pub const NOT_INGESTED_SOLUTION: &str = "N/A";

/// Solution text when retrieval found nothing.
pub const NO_MATCHES_SOLUTION: &str = "No similar issues found to base a solution on.";

/// Result of a search-and-summarize request.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// The project has no usable snapshot
    NotIngested {
        project_key: String,
        /// Set when a snapshot exists but could not be loaded
        reason: Option<String>,
    },

    /// The index returned no tickets; generation was not attempted
    NoMatches,

    /// Retrieval could not run (bad project config, embedder unavailable)
    Failed {
        project_key: String,
        message: String,
    },

    /// Ranked tickets with a synthesized (or fallback) solution
    Answered {
        results: Vec<SearchResult>,
        solution: String,
    },
}

/// A ticket as shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarTicket {
    pub ticket_id: String,
    pub summary: String,
    pub link: String,
    pub distance: f32,
}

/// Serializable response shape for the search surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// "success" or "error"
    pub status: String,
    pub message: String,
    pub similar_tickets: Vec<SimilarTicket>,
    pub solution: String,
}

impl SearchOutcome {
    /// Build the user-facing response, linking tickets under `browse_base`.
    pub fn to_response(&self, browse_base: &str) -> SearchResponse {
        match self {
            Self::NotIngested {
                project_key,
                reason,
            } => {
                let mut message = format!(
                    "Data for project '{}' not found or could not be loaded. Please ensure data is ingested.",
                    project_key
                );
                if let Some(reason) = reason {
                    message.push_str(&format!(" ({})", reason));
                }
                SearchResponse {
                    status: "error".to_string(),
                    message,
                    similar_tickets: Vec::new(),
                    solution: NOT_INGESTED_SOLUTION.to_string(),
                }
            }
            Self::Failed { message, .. } => SearchResponse {
                status: "error".to_string(),
                message: message.clone(),
                similar_tickets: Vec::new(),
                solution: NOT_INGESTED_SOLUTION.to_string(),
            },
            Self::NoMatches => SearchResponse {
                status: "success".to_string(),
                message: "No similar tickets found for this description in the specified project."
                    .to_string(),
                similar_tickets: Vec::new(),
                solution: NO_MATCHES_SOLUTION.to_string(),
            },
            Self::Answered { results, solution } => SearchResponse {
                status: "success".to_string(),
                message: "Search and solution generated successfully.".to_string(),
                similar_tickets: results
                    .iter()
                    .map(|r| SimilarTicket {
                        ticket_id: r.ticket.ticket_id.clone(),
                        summary: r.ticket.summary.clone(),
                        link: ticket_link(browse_base, &r.ticket.ticket_id),
                        distance: r.distance,
                    })
                    .collect(),
                solution: solution.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TicketRecord;

    #[test]
    fn test_not_ingested_response() {
        let outcome = SearchOutcome::NotIngested {
            project_key: "OPS".to_string(),
            reason: None,
        };
        let response = outcome.to_response("");

        assert_eq!(response.status, "error");
        assert!(response.message.contains("'OPS'"));
        assert_eq!(response.solution, "N/A");
        assert!(response.similar_tickets.is_empty());
    }

    #[test]
    fn test_answered_response_json_shape() {
        let outcome = SearchOutcome::Answered {
            results: vec![SearchResult {
                ticket: TicketRecord {
                    summary: "Disk full".to_string(),
                    ..TicketRecord::new("OPS-3")
                },
                distance: 0.25,
            }],
            solution: "Free space.".to_string(),
        };

        let json = serde_json::to_value(outcome.to_response("https://x.example/browse/")).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["similarTickets"][0]["ticketId"], "OPS-3");
        assert_eq!(json["similarTickets"][0]["link"], "https://x.example/browse/OPS-3");
        assert_eq!(json["solution"], "Free space.");
    }

    #[test]
    fn test_failed_response_json_shape() {
        let outcome = SearchOutcome::Failed {
            project_key: "OPS".to_string(),
            message: "LLM error: connection refused".to_string(),
        };

        let json = serde_json::to_value(outcome.to_response("")).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "LLM error: connection refused");
        assert_eq!(json["similarTickets"], serde_json::json!([]));
        assert_eq!(json["solution"], "N/A");
    }

    #[test]
    fn test_no_matches_response() {
        let response = SearchOutcome::NoMatches.to_response("");
        assert_eq!(response.status, "success");
        assert_eq!(response.solution, NO_MATCHES_SOLUTION);
    }
}
