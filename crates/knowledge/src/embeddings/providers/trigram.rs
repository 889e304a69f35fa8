//! Offline embedder hashing words and character trigrams into a fixed vector.

use crate::embeddings::provider::EmbeddingProvider;
use std::collections::BTreeMap;
use triage_core::AppResult;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "not", "when", "after", "can", "cannot",
];

/// Trigram-based embedding provider for local, offline operation.
///
/// Vectors are deterministic and content-dependent but carry no real
/// semantics. Tickets sharing vocabulary land close together, which is
/// enough to rank a project's history without a model server.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

fn fnv_bucket(bytes: &[u8], seed: u64, dimensions: usize) -> usize {
    let hash = bytes
        .iter()
        .fold(seed, |acc, b| (acc ^ u64::from(*b)).wrapping_mul(0x100_0000_01b3));
    (hash % dimensions as u64) as usize
}

impl TrigramProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        // BTreeMap keeps accumulation order stable across runs
        let mut word_freq: BTreeMap<&str, u32> = BTreeMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|w| w.chars().count() > 1 && !STOP_WORDS.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let weight = *freq as f32;

            let padded: Vec<char> = format!(" {} ", word).chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                let idx = fnv_bucket(trigram.as_bytes(), 0xcbf2_9ce4_8422_2325, self.dimensions);
                embedding[idx] += weight.sqrt();
            }

            let idx = fnv_bucket(word.as_bytes(), 0x8422_2325_cbf2_9ce4, self.dimensions);
            embedding[idx] += weight;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
