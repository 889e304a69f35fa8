//! Vector index over ticket embeddings.
//!
//! The index is a flat, exact L2 index: every search scans all vectors.
//! Ticket corpora are small enough that exactness beats an ANN structure,
//! and a rebuild on every ingestion keeps positions aligned with metadata.

use crate::embeddings::EmbedderIdentity;
use crate::persist::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use triage_core::{AppError, AppResult};

/// Nearest-neighbor search over positioned vectors.
pub trait VectorIndex: Send + Sync {
    /// Number of indexed vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector dimensionality.
    fn dimensions(&self) -> usize;

    /// Ticket id stored at `position`.
    fn ticket_id(&self, position: usize) -> Option<&str>;

    /// Return up to `k` `(position, distance)` pairs, nearest first.
    ///
    /// `k` is clamped to the index size.
    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<(usize, f32)>>;
}

/// Exact index using squared Euclidean distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatL2Index {
    dimensions: usize,

    /// Ticket id per position; enforces alignment with the metadata file
    ticket_ids: Vec<String>,

    /// One row per position
    vectors: Vec<Vec<f32>>,

    embedder: EmbedderIdentity,

    built_at: DateTime<Utc>,
}

impl FlatL2Index {
    /// Build an index from vectors and the ticket id at each position.
    pub fn build(
        embedder: EmbedderIdentity,
        ticket_ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
    ) -> AppResult<Self> {
        if ticket_ids.len() != vectors.len() {
            return Err(AppError::Knowledge(format!(
                "Cannot build index: {} ticket ids for {} vectors",
                ticket_ids.len(),
                vectors.len()
            )));
        }

        if let Some((pos, v)) = vectors
            .iter()
            .enumerate()
            .find(|(_, v)| v.len() != embedder.dimensions)
        {
            return Err(AppError::Knowledge(format!(
                "Cannot build index: vector {} has {} dims, expected {}",
                pos,
                v.len(),
                embedder.dimensions
            )));
        }

        Ok(Self {
            dimensions: embedder.dimensions,
            ticket_ids,
            vectors,
            embedder,
            built_at: Utc::now(),
        })
    }

    pub fn embedder(&self) -> &EmbedderIdentity {
        &self.embedder
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn ticket_ids(&self) -> &[String] {
        &self.ticket_ids
    }

    /// Write the index payload to `path` atomically.
    pub fn save(&self, path: &Path) -> AppResult<()> {
        let json = serde_json::to_vec(self)?;
        write_atomic(path, &json)
    }

    /// Load and validate an index payload.
    pub fn load(path: &Path) -> AppResult<Self> {
        let bytes = std::fs::read(path)?;
        let index: Self = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::corrupt(path, format!("invalid index payload: {}", e)))?;
        index
            .check_shape()
            .map_err(|reason| AppError::corrupt(path, reason))?;
        Ok(index)
    }

    fn check_shape(&self) -> Result<(), String> {
        if self.dimensions != self.embedder.dimensions {
            return Err(format!(
                "index declares {} dims but embedder {}",
                self.dimensions, self.embedder
            ));
        }
        if self.vectors.len() != self.ticket_ids.len() {
            return Err(format!(
                "{} vectors but {} ticket ids",
                self.vectors.len(),
                self.ticket_ids.len()
            ));
        }
        if let Some(pos) = self.vectors.iter().position(|v| v.len() != self.dimensions) {
            return Err(format!(
                "vector {} has {} dims, expected {}",
                pos,
                self.vectors[pos].len(),
                self.dimensions
            ));
        }
        Ok(())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl VectorIndex for FlatL2Index {
    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn ticket_id(&self, position: usize) -> Option<&str> {
        self.ticket_ids.get(position).map(String::as_str)
    }

    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<(usize, f32)>> {
        if query.len() != self.dimensions {
            return Err(AppError::Knowledge(format!(
                "Query has {} dims, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let k = k.min(self.vectors.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(pos, v)| (pos, squared_l2(query, v)))
            .collect();

        // Ties break toward the lower position
        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn identity(dimensions: usize) -> EmbedderIdentity {
        EmbedderIdentity {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions,
        }
    }

    fn sample_index() -> FlatL2Index {
        FlatL2Index::build(
            identity(2),
            vec!["A-1".into(), "A-2".into(), "A-3".into(), "A-4".into()],
            vec![
                vec![0.0, 0.0],
                vec![3.0, 4.0],
                vec![1.0, 0.0],
                vec![0.0, 1.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_search_orders_by_distance() {
        let index = sample_index();
        let results = index.search(&[0.9, 0.1], 4).unwrap();

        let positions: Vec<usize> = results.iter().map(|(p, _)| *p).collect();
        assert_eq!(positions, vec![2, 0, 3, 1]);
        assert!(results.windows(2).all(|w| w[0].1 <= w[1].1));
        assert!((results[0].1 - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_search_clamps_k() {
        let index = sample_index();
        assert_eq!(index.search(&[0.0, 0.0], 10).unwrap().len(), 4);
        assert!(index.search(&[0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_ties_break_by_position() {
        let index = sample_index();
        // Positions 0, 2 and 3 are equidistant
        let results = index.search(&[0.5, 0.5], 2).unwrap();
        assert_eq!(results[0].0, 0);
        assert_eq!(results[1].0, 2);
        let results = index.search(&[1.0, 1.0], 2).unwrap();
        assert_eq!(results[0].0, 2);
        assert_eq!(results[1].0, 3);
    }

    #[test]
    fn test_empty_index() {
        let index = FlatL2Index::build(identity(3), vec![], vec![]).unwrap();
        assert!(index.is_empty());
        assert!(index.search(&[0.0, 0.0, 0.0], 4).unwrap().is_empty());
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let index = sample_index();
        assert!(index.search(&[1.0, 2.0, 3.0], 1).is_err());
    }

    #[test]
    fn test_build_rejects_misaligned_input() {
        assert!(FlatL2Index::build(identity(2), vec!["A-1".into()], vec![]).is_err());
        assert!(FlatL2Index::build(identity(2), vec!["A-1".into()], vec![vec![1.0]]).is_err());
    }

    #[test]
    fn test_save_load_preserves_neighbors() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.json");

        let vectors: Vec<Vec<f32>> = (0..20)
            .map(|i| vec![(i as f32 * 0.37).sin(), (i as f32 * 1.3).cos(), 0.1 * i as f32])
            .collect();
        let ids = (0..20).map(|i| format!("A-{}", i)).collect();
        let index = FlatL2Index::build(identity(3), ids, vectors).unwrap();

        index.save(&path).unwrap();
        let loaded = FlatL2Index::load(&path).unwrap();

        let query = [0.2, -0.4, 0.9];
        assert_eq!(index.search(&query, 5).unwrap(), loaded.search(&query, 5).unwrap());
        assert_eq!(loaded.ticket_id(7), Some("A-7"));
    }

    #[test]
    fn test_load_rejects_bad_shape() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.json");
        let mut index = sample_index();
        index.vectors[1] = vec![1.0];
        std::fs::write(&path, serde_json::to_vec(&index).unwrap()).unwrap();

        let err = FlatL2Index::load(&path).unwrap_err();
        assert!(matches!(err, AppError::CorruptArtifact { .. }));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.json");
        std::fs::write(&path, "{ nope").unwrap();

        assert!(matches!(
            FlatL2Index::load(&path),
            Err(AppError::CorruptArtifact { .. })
        ));
    }
}
