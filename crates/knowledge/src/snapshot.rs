//! Generation-based publishing of the index and metadata pair.
//!
//! Each ingestion writes `snapshots/<generation>/{index.json,metadata.json}`
//! and then swaps the `CURRENT` pointer. Readers resolve `CURRENT` first, so
//! they never pair an index with metadata from a different run.

use crate::config::{get_current_path, get_project_dir, get_snapshot_dir, get_snapshots_dir};
use crate::persist::{read_optional, write_atomic};
use crate::types::{ProjectCorpus, TicketRecord};
use crate::vector_index::{FlatL2Index, VectorIndex};
use std::fs;
use std::path::Path;
use triage_core::{AppError, AppResult};

const INDEX_FILE: &str = "index.json";
const METADATA_FILE: &str = "metadata.json";

/// A loaded, alignment-checked index and metadata pair.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub generation: u64,
    pub index: FlatL2Index,
    /// `metadata[i]` is the ticket at index position `i`
    pub metadata: Vec<TicketRecord>,
}

/// Generation named by `CURRENT`, if any.
pub fn current_generation(workspace: &Path, project_key: &str) -> AppResult<Option<u64>> {
    let path = get_current_path(workspace, project_key);
    match read_optional(&path)? {
        None => Ok(None),
        Some(contents) => contents
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| AppError::corrupt(&path, format!("invalid generation: {}", e))),
    }
}

fn existing_generations(workspace: &Path, project_key: &str) -> AppResult<Vec<u64>> {
    let dir = get_snapshots_dir(workspace, project_key);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut generations = Vec::new();
    for entry in entries {
        let entry = entry?;
        if let Some(generation) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<u64>().ok())
        {
            generations.push(generation);
        }
    }
    generations.sort_unstable();
    Ok(generations)
}

/// Publish a new snapshot and return its generation.
///
/// The metadata must be aligned with the index. After `CURRENT` moves, every
/// generation other than the new one and the one it replaced is removed.
pub fn publish(
    workspace: &Path,
    project_key: &str,
    index: &FlatL2Index,
    metadata: &ProjectCorpus,
) -> AppResult<u64> {
    check_alignment(index, metadata.records())
        .map_err(|reason| AppError::Knowledge(format!("Refusing to publish: {}", reason)))?;

    // An unreadable pointer is replaced rather than blocking the publish
    let previous = current_generation(workspace, project_key).unwrap_or_else(|e| {
        tracing::warn!("Ignoring unreadable CURRENT for '{}': {}", project_key, e);
        None
    });
    let existing = existing_generations(workspace, project_key)?;
    let generation = existing
        .iter()
        .copied()
        .chain(previous)
        .max()
        .map_or(1, |g| g + 1);

    let dir = get_snapshot_dir(workspace, project_key, generation);
    fs::create_dir_all(&dir)?;

    index.save(&dir.join(INDEX_FILE))?;
    write_atomic(&dir.join(METADATA_FILE), &serde_json::to_vec(metadata)?)?;

    write_atomic(
        &get_current_path(workspace, project_key),
        generation.to_string().as_bytes(),
    )?;

    tracing::info!(
        "Published snapshot generation {} for '{}' ({} tickets)",
        generation,
        project_key,
        index.len()
    );

    for old in existing
        .into_iter()
        .filter(|g| *g != generation && Some(*g) != previous)
    {
        let old_dir = get_snapshot_dir(workspace, project_key, old);
        if let Err(e) = fs::remove_dir_all(&old_dir) {
            tracing::warn!("Failed to remove old snapshot {:?}: {}", old_dir, e);
        } else {
            tracing::debug!("Removed old snapshot {:?}", old_dir);
        }
    }

    Ok(generation)
}

/// Load the live snapshot.
///
/// Returns `Ok(None)` when the project was never ingested (no `CURRENT`, or
/// it names a generation whose files are gone). Parse and alignment failures
/// are `AppError::CorruptArtifact`.
pub fn load_current(workspace: &Path, project_key: &str) -> AppResult<Option<Snapshot>> {
    let Some(generation) = current_generation(workspace, project_key)? else {
        return Ok(None);
    };

    let dir = get_snapshot_dir(workspace, project_key, generation);
    let index_path = dir.join(INDEX_FILE);
    let metadata_path = dir.join(METADATA_FILE);

    if !index_path.exists() || !metadata_path.exists() {
        tracing::warn!(
            "CURRENT for '{}' names generation {} but its files are missing",
            project_key,
            generation
        );
        return Ok(None);
    }

    let index = FlatL2Index::load(&index_path)?;

    let bytes = fs::read(&metadata_path)?;
    let metadata: Vec<TicketRecord> = serde_json::from_slice(&bytes)
        .map_err(|e| AppError::corrupt(&metadata_path, format!("invalid metadata: {}", e)))?;

    check_alignment(&index, &metadata).map_err(|reason| AppError::corrupt(&dir, reason))?;

    tracing::debug!(
        "Loaded snapshot generation {} for '{}' ({} tickets)",
        generation,
        project_key,
        metadata.len()
    );

    Ok(Some(Snapshot {
        generation,
        index,
        metadata,
    }))
}

fn check_alignment(index: &FlatL2Index, metadata: &[TicketRecord]) -> Result<(), String> {
    if index.len() != metadata.len() {
        return Err(format!(
            "index has {} vectors but metadata has {} records",
            index.len(),
            metadata.len()
        ));
    }

    for (pos, record) in metadata.iter().enumerate() {
        if index.ticket_id(pos) != Some(record.ticket_id.as_str()) {
            return Err(format!(
                "position {} holds '{}' in metadata but '{}' in the index",
                pos,
                record.ticket_id,
                index.ticket_id(pos).unwrap_or("")
            ));
        }
    }

    Ok(())
}

/// Remove every persisted artifact for a project. Returns whether anything existed.
pub fn remove_project(workspace: &Path, project_key: &str) -> AppResult<bool> {
    let dir = get_project_dir(workspace, project_key);
    match fs::remove_dir_all(&dir) {
        Ok(()) => {
            tracing::info!("Removed project directory {:?}", dir);
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
