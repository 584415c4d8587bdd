//! Similarity index abstraction for Podsift.
//!
//! Provides a trait-based interface over the stores that hold embedded chunks
//! and the raw transcript lines they were built from.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::chunking::Chunk;
use crate::config::Settings;
use crate::embedding::EmbeddingVariant;
use crate::error::{PodsiftError, Result};
use crate::transcript::TranscriptLine;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A chunk together with its embeddings, as written to the index.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    /// Embedding of the speaker-free text.
    pub embedding: Vec<f32>,
    /// Embedding of the speaker-labelled text, when it was computed.
    pub speaker_embedding: Option<Vec<f32>>,
    /// When this chunk was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl IndexedChunk {
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            chunk,
            embedding,
            speaker_embedding: None,
            indexed_at: Utc::now(),
        }
    }

    pub fn with_speaker_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.speaker_embedding = Some(embedding);
        self
    }

    /// The stored vector a query over `variant` is scored against.
    pub fn embedding_for(&self, variant: EmbeddingVariant) -> &[f32] {
        select_embedding(variant, &self.embedding, self.speaker_embedding.as_deref())
    }
}

/// Vector for `variant`; chunks without a speaker embedding fall back to the text one.
pub(crate) fn select_embedding<'a>(
    variant: EmbeddingVariant,
    text: &'a [f32],
    speaker: Option<&'a [f32]>,
) -> &'a [f32] {
    match (variant, speaker) {
        (EmbeddingVariant::Speaker, Some(speaker)) => speaker,
        _ => text,
    }
}

/// A nearest-neighbour hit with its score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Inclusive numeric bounds on a chunk's start time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub gte: Option<f64>,
    pub lte: Option<f64>,
}

impl TimeRange {
    pub fn contains(&self, seconds: f64) -> bool {
        self.gte.is_none_or(|lo| seconds >= lo) && self.lte.is_none_or(|hi| seconds <= hi)
    }
}

/// Metadata filter: episode equality and a start-time range, both optional.
///
/// `variant` picks which stored embedding vector queries are scored against;
/// it never excludes chunks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkFilter {
    pub episode_id: Option<String>,
    pub start_time: Option<TimeRange>,
    #[serde(default)]
    pub variant: EmbeddingVariant,
}

impl ChunkFilter {
    /// Matches every chunk.
    pub fn any() -> Self {
        Self::default()
    }

    /// Chunks of a single episode.
    pub fn episode(episode_id: impl Into<String>) -> Self {
        Self {
            episode_id: Some(episode_id.into()),
            ..Self::default()
        }
    }

    /// Chunks starting at or after `seconds`, across all episodes.
    pub fn starting_from(seconds: f64) -> Self {
        Self {
            start_time: Some(TimeRange {
                gte: Some(seconds),
                lte: None,
            }),
            ..Self::default()
        }
    }

    /// Score queries against the `variant` embeddings.
    pub fn scored_by(mut self, variant: EmbeddingVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Restrict to chunks starting within `[from, to]`.
    pub fn between(mut self, from: Option<f64>, to: Option<f64>) -> Self {
        self.start_time = if from.is_none() && to.is_none() {
            None
        } else {
            Some(TimeRange { gte: from, lte: to })
        };
        self
    }

    pub fn matches(&self, chunk: &Chunk) -> bool {
        self.episode_id
            .as_deref()
            .is_none_or(|id| chunk.episode_id() == id)
            && self
                .start_time
                .is_none_or(|range| range.contains(chunk.start_time))
    }
}

/// Summary information about an indexed episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedEpisode {
    pub episode_id: String,
    pub episode_name: String,
    pub guest_name: Option<String>,
    pub release_date: Option<String>,
    /// Number of indexed chunks.
    pub chunk_count: u32,
    /// End of the last chunk, in seconds.
    pub total_duration_seconds: f64,
    /// When the episode was last indexed.
    pub indexed_at: DateTime<Utc>,
}

/// Trait for similarity index implementations.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Bulk upsert chunks keyed by chunk ID.
    async fn upsert_batch(&self, chunks: &[IndexedChunk]) -> Result<usize>;

    /// Nearest-neighbour query restricted by `filter`, best first.
    async fn query(
        &self,
        embedding: &[f32],
        filter: &ChunkFilter,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>>;

    /// Exact metadata query without a vector, ordered by start time then chunk index.
    async fn fetch(&self, filter: &ChunkFilter, limit: usize) -> Result<Vec<Chunk>>;

    /// Delete every chunk of an episode.
    async fn delete_episode(&self, episode_id: &str) -> Result<usize>;

    /// List all indexed episodes.
    async fn list_episodes(&self) -> Result<Vec<IndexedEpisode>>;

    /// Check if an episode has any indexed chunks.
    async fn is_episode_indexed(&self, episode_id: &str) -> Result<bool>;

    /// Get total chunk count.
    async fn chunk_count(&self) -> Result<usize>;

    /// Keep the raw lines of an episode so its chunks can be rebuilt.
    async fn store_lines(&self, episode_id: &str, lines: &[TranscriptLine]) -> Result<()>;

    /// Raw lines stored for an episode.
    async fn get_lines(&self, episode_id: &str) -> Result<Option<Vec<TranscriptLine>>>;

    /// Episodes with stored raw lines.
    async fn list_stored_episodes(&self) -> Result<Vec<String>>;
}

/// Open the index selected by `vector_store.provider`.
pub fn open_index(settings: &Settings) -> Result<Arc<dyn SimilarityIndex>> {
    match settings.vector_store.provider.as_str() {
        "sqlite" => Ok(Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?)),
        "memory" => Ok(Arc::new(MemoryVectorStore::new())),
        other => Err(PodsiftError::Config(format!(
            "Unknown vector store provider: {}",
            other
        ))),
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Order chunks by start time, then chunk index.
pub(crate) fn sort_by_position(chunks: &mut [Chunk]) {
    chunks.sort_by(|a, b| {
        a.start_time
            .total_cmp(&b.start_time)
            .then(a.chunk_index.cmp(&b.chunk_index))
    });
}


#[cfg(test)]
mod tests {
    use super::test_support::{chunk, indexed};
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_filter_matching() {
        let c = chunk("ep1", 0, 100.0, "hello");

        assert!(ChunkFilter::any().matches(&c));
        assert!(ChunkFilter::episode("ep1").matches(&c));
        assert!(!ChunkFilter::episode("ep2").matches(&c));
        assert!(ChunkFilter::episode("ep1")
            .between(Some(100.0), Some(160.0))
            .matches(&c));
        assert!(!ChunkFilter::episode("ep1")
            .between(Some(100.5), Some(160.0))
            .matches(&c));
        assert!(!ChunkFilter::starting_from(120.0).matches(&c));
    }

    #[test]
    fn test_speaker_variant_falls_back_to_text_embedding() {
        let plain = indexed(chunk("ep1", 0, 0.0, "a"), vec![1.0, 0.0]);
        assert_eq!(plain.embedding_for(EmbeddingVariant::Speaker), &[1.0, 0.0]);

        let labelled = plain.with_speaker_embedding(vec![0.0, 1.0]);
        assert_eq!(labelled.embedding_for(EmbeddingVariant::Text), &[1.0, 0.0]);
        assert_eq!(labelled.embedding_for(EmbeddingVariant::Speaker), &[0.0, 1.0]);
    }

    #[test]
    fn test_variant_does_not_filter() {
        let c = chunk("ep1", 0, 100.0, "hello");
        let filter = ChunkFilter::episode("ep1").scored_by(EmbeddingVariant::Speaker);
        assert!(filter.matches(&c));
        assert_eq!(filter.variant, EmbeddingVariant::Speaker);
    }

    #[test]
    fn test_between_without_bounds_clears_range() {
        let filter = ChunkFilter::starting_from(90.0).between(None, None);
        assert_eq!(filter.start_time, None);
    }
}
