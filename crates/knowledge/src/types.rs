//! Ticket and pipeline type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// One support ticket as stored in a project corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    /// Tracker identifier, unique within a project (e.g. "OPS-42")
    pub ticket_id: String,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub root_cause: String,

    #[serde(default)]
    pub root_cause_category: String,

    #[serde(default)]
    pub labels: BTreeSet<String>,

    /// All comment bodies joined into one string
    #[serde(default)]
    pub comments: String,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub resolution: String,
}

impl TicketRecord {
    /// Create a record with only an identifier; remaining fields are empty.
    pub fn new(ticket_id: impl Into<String>) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            summary: String::new(),
            description: String::new(),
            root_cause: String::new(),
            root_cause_category: String::new(),
            labels: BTreeSet::new(),
            comments: String::new(),
            status: String::new(),
            resolution: String::new(),
        }
    }

    /// Text fed to the embedder.
    ///
    /// Field order is fixed: summary, description, root cause, root cause
    /// category, comments, labels. Labels are comma-joined; fields are
    /// separated by a single space.
    pub fn embedding_text(&self) -> String {
        let labels = self
            .labels
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");

        [
            self.summary.as_str(),
            self.description.as_str(),
            self.root_cause.as_str(),
            self.root_cause_category.as_str(),
            self.comments.as_str(),
            labels.as_str(),
        ]
        .join(" ")
    }
}

/// Ordered ticket collection for one project key.
///
/// Order reflects merge arrival; ticket ids are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectCorpus {
    records: Vec<TicketRecord>,
}

impl ProjectCorpus {
    /// Build a corpus, keeping the last occurrence of any repeated ticket id.
    pub fn new(records: Vec<TicketRecord>) -> Self {
        let mut seen = HashSet::new();
        let mut kept: Vec<TicketRecord> = records
            .into_iter()
            .rev()
            .filter(|r| seen.insert(r.ticket_id.clone()))
            .collect();
        kept.reverse();
        Self { records: kept }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[TicketRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TicketRecord> {
        self.records.iter()
    }

    /// Look up a record by ticket id.
    pub fn get(&self, ticket_id: &str) -> Option<&TicketRecord> {
        self.records.iter().find(|r| r.ticket_id == ticket_id)
    }

    /// Ticket ids in corpus order.
    pub fn ticket_ids(&self) -> Vec<String> {
        self.records.iter().map(|r| r.ticket_id.clone()).collect()
    }
}

impl From<Vec<TicketRecord>> for ProjectCorpus {
    fn from(records: Vec<TicketRecord>) -> Self {
        Self::new(records)
    }
}

impl<'a> IntoIterator for &'a ProjectCorpus {
    type Item = &'a TicketRecord;
    type IntoIter = std::slice::Iter<'a, TicketRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// A retrieved ticket with its distance to the query (lower is closer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub ticket: TicketRecord,
    pub distance: f32,
}

/// How fetched tickets combine with the persisted corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// Fetched tickets become the whole corpus
    Replace,
    /// Fetched tickets are merged over the persisted corpus
    Merge,
}

impl IngestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Merge => "merge",
        }
    }
}

/// Options for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Project key (e.g. "OPS")
    pub project_key: String,

    /// Tracker query selecting the tickets to fetch
    pub query: String,

    pub mode: IngestMode,
}

impl IngestOptions {
    pub fn replace(project_key: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            project_key: project_key.into(),
            query: query.into(),
            mode: IngestMode::Replace,
        }
    }

    pub fn merge(project_key: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            project_key: project_key.into(),
            query: query.into(),
            mode: IngestMode::Merge,
        }
    }
}

/// Statistics from a completed ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    pub project_key: String,
    pub mode: IngestMode,

    /// Tickets returned by the source
    pub fetched: usize,

    /// Records in the prior corpus that took part in the merge
    pub previous: usize,

    /// Records in the published corpus
    pub corpus_size: usize,

    /// Snapshot generation that was published
    pub generation: u64,

    pub duration_secs: f64,
}

/// Statistics for a project's persisted artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub project_key: String,

    /// Records in `corpus.jsonl` (0 when absent)
    pub corpus_size: usize,

    /// Live snapshot generation, if any
    pub generation: Option<u64>,

    /// Vectors in the live index
    pub index_size: usize,

    pub dimensions: Option<usize>,

    /// Embedder as `provider/model`
    pub embedder: Option<String>,

    pub last_ingested_at: Option<DateTime<Utc>>,
}
