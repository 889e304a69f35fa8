//! Retrieval-augmented answering over a ticket corpus.

pub mod answer;
pub mod synthesize;
pub mod types;

pub use answer::search_and_summarize;
pub use synthesize::{ticket_link, ContextSynthesizer, FALLBACK_SOLUTION, MAX_CONTEXT_TICKETS};
pub use types::{SearchOutcome, SearchResponse, SimilarTicket, NO_MATCHES_SOLUTION};
