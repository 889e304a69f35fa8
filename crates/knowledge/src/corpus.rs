//! Corpus store: merge policy and the `corpus.jsonl` file.

use crate::config::get_corpus_path;
use crate::persist::{read_optional, write_atomic};
use crate::types::{ProjectCorpus, TicketRecord};
use std::collections::HashSet;
use std::path::Path;
use triage_core::{AppError, AppResult};

/// Merge `incoming` over `existing`.
///
/// Existing records whose id appears in `incoming` are dropped, then all of
/// `incoming` is appended, so the fresher copy of a ticket wins while
/// untouched history is kept.
pub fn merge(existing: &ProjectCorpus, incoming: &ProjectCorpus) -> ProjectCorpus {
    let incoming_ids: HashSet<&str> = incoming.iter().map(|r| r.ticket_id.as_str()).collect();

    let records: Vec<TicketRecord> = existing
        .iter()
        .filter(|r| !incoming_ids.contains(r.ticket_id.as_str()))
        .chain(incoming.iter())
        .cloned()
        .collect();

    ProjectCorpus::new(records)
}

/// Load a project's persisted corpus.
///
/// Returns `Ok(None)` when no corpus has been written yet and
/// `AppError::CorruptArtifact` when a line fails to parse.
pub fn load_corpus(workspace: &Path, project_key: &str) -> AppResult<Option<ProjectCorpus>> {
    let path = get_corpus_path(workspace, project_key);

    let Some(contents) = read_optional(&path)? else {
        return Ok(None);
    };

    let mut records = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: TicketRecord = serde_json::from_str(line).map_err(|e| {
            AppError::corrupt(&path, format!("line {}: {}", line_no + 1, e))
        })?;
        records.push(record);
    }

    let corpus = ProjectCorpus::new(records);
    tracing::debug!("Loaded {} records from {:?}", corpus.len(), path);
    Ok(Some(corpus))
}

/// Persist a project's corpus, replacing the previous file atomically.
pub fn save_corpus(workspace: &Path, project_key: &str, corpus: &ProjectCorpus) -> AppResult<()> {
    let path = get_corpus_path(workspace, project_key);

    let mut buf = String::new();
    for record in corpus {
        buf.push_str(&serde_json::to_string(record)?);
        buf.push('\n');
    }

    write_atomic(&path, buf.as_bytes())?;
    tracing::debug!("Saved {} records to {:?}", corpus.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ticket(id: &str, status: &str) -> TicketRecord {
        TicketRecord {
            summary: format!("summary of {}", id),
            status: status.to_string(),
            ..TicketRecord::new(id)
        }
    }

    fn corpus(records: &[(&str, &str)]) -> ProjectCorpus {
        ProjectCorpus::new(records.iter().map(|(id, s)| ticket(id, s)).collect())
    }

    #[test]
    fn test_merge_incoming_wins() {
        let existing = corpus(&[("A-1", "Open"), ("A-2", "Open")]);
        let incoming = corpus(&[("A-2", "Done")]);

        let merged = merge(&existing, &incoming);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get("A-2").unwrap().status, "Done");
        assert_eq!(merged.get("A-1").unwrap().status, "Open");
        assert_eq!(merged.ticket_ids(), vec!["A-1", "A-2"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing = corpus(&[("A-1", "Open"), ("A-2", "Open"), ("A-3", "Open")]);
        let incoming = corpus(&[("A-3", "Done"), ("A-4", "Open"), ("A-1", "Done")]);

        let once = merge(&existing, &incoming);
        let twice = merge(&once, &incoming);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_into_empty() {
        let incoming = corpus(&[("A-1", "Open")]);
        assert_eq!(merge(&ProjectCorpus::empty(), &incoming), incoming);
    }

    #[test]
    fn test_merge_never_duplicates() {
        let existing = corpus(&[("A-1", "Open")]);
        let incoming = ProjectCorpus::new(vec![ticket("A-1", "Open"), ticket("A-1", "Done")]);

        let merged = merge(&existing, &incoming);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get("A-1").unwrap().status, "Done");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let original = corpus(&[("OPS-1", "Done"), ("OPS-2", "Open")]);

        save_corpus(temp.path(), "OPS", &original).unwrap();
        let loaded = load_corpus(temp.path(), "OPS").unwrap().unwrap();

        assert_eq!(loaded, original);
    }

    #[test]
    fn test_load_missing_corpus() {
        let temp = TempDir::new().unwrap();
        assert!(load_corpus(temp.path(), "OPS").unwrap().is_none());
    }

    #[test]
    fn test_load_corrupt_corpus_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = get_corpus_path(temp.path(), "OPS");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{\"ticket_id\":\"OPS-1\"}\nnot json\n").unwrap();

        let err = load_corpus(temp.path(), "OPS").unwrap_err();
        assert!(matches!(err, AppError::CorruptArtifact { .. }));
        assert!(err.to_string().contains("line 2"));
    }
}
