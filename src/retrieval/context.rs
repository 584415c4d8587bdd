//! Expanding a single hit into the conversation that follows it.

use super::SearchHit;
use crate::chunking::Chunk;
use crate::config::RetrievalSettings;
use crate::embedding::EmbeddingVariant;
use crate::vector_store::{sort_by_position, ChunkFilter, SimilarityIndex};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Separator placed between merged co-located fragments.
const FRAGMENT_SEPARATOR: &str = "\n\n";

/// One displayable piece of a context window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextFragment {
    pub chunk_index: u32,
    pub start_time: f64,
    pub end_time: f64,
    pub speaker: String,
    pub text: String,
    pub text_with_speaker: String,
}

impl From<Chunk> for ContextFragment {
    fn from(chunk: Chunk) -> Self {
        Self {
            chunk_index: chunk.chunk_index,
            start_time: chunk.start_time,
            end_time: chunk.end_time,
            speaker: chunk.speaker,
            text: chunk.text,
            text_with_speaker: chunk.text_with_speaker,
        }
    }
}

/// Time-ordered fragments of one episode surrounding a hit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContextWindow {
    pub episode_id: String,
    pub fragments: Vec<ContextFragment>,
}

impl ContextWindow {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Fragment texts, in window order.
    pub fn passages(&self) -> Vec<String> {
        self.fragments.iter().map(|f| f.text.clone()).collect()
    }
}

/// Sort chunks by position and merge those sharing a start time.
///
/// Merged fragments keep the first fragment's speaker and index; texts are
/// joined with a blank line. Start times are compared exactly.
pub fn merge_fragments(mut chunks: Vec<Chunk>) -> Vec<ContextFragment> {
    sort_by_position(&mut chunks);

    let mut merged: Vec<ContextFragment> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        match merged.last_mut() {
            Some(last) if last.start_time == chunk.start_time => {
                last.text.push_str(FRAGMENT_SEPARATOR);
                last.text.push_str(&chunk.text);
                last.text_with_speaker.push_str(FRAGMENT_SEPARATOR);
                last.text_with_speaker.push_str(&chunk.text_with_speaker);
                last.end_time = last.end_time.max(chunk.end_time);
            }
            _ => merged.push(ContextFragment::from(chunk)),
        }
    }
    merged
}

/// Re-queries the index around a hit and builds its context window.
pub struct ContextAssembler {
    index: Arc<dyn SimilarityIndex>,
    window_seconds: f64,
    top_k: usize,
}

impl ContextAssembler {
    pub fn new(index: Arc<dyn SimilarityIndex>) -> Self {
        Self {
            index,
            window_seconds: 60.0,
            top_k: 100,
        }
    }

    pub fn from_settings(index: Arc<dyn SimilarityIndex>, settings: &RetrievalSettings) -> Self {
        Self::new(index)
            .with_window_seconds(settings.context_window_seconds)
            .with_top_k(settings.context_top_k)
    }

    /// Length of the window following the hit, in seconds.
    pub fn with_window_seconds(mut self, seconds: f64) -> Self {
        self.window_seconds = seconds;
        self
    }

    /// Maximum chunks fetched for one window.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Build the context window for `hit`, scoring against the `variant`
    /// embeddings the hit was found with.
    ///
    /// Never fails: a failed windowed lookup is retried once scoped to the
    /// episode alone, and a second failure yields an empty window.
    pub async fn assemble(
        &self,
        hit: &SearchHit,
        query_embedding: &[f32],
        variant: EmbeddingVariant,
    ) -> ContextWindow {
        let episode_id = hit.episode_id();
        let start = hit.start_time();

        let windowed = ChunkFilter::episode(episode_id)
            .between(Some(start), Some(start + self.window_seconds))
            .scored_by(variant);

        let chunks = match self.index.query(query_embedding, &windowed, self.top_k).await {
            Ok(found) => found,
            Err(e) => {
                warn!(
                    "Context lookup for {} @ {:.1}s failed, retrying episode-wide: {}",
                    episode_id, start, e
                );
                match self
                    .index
                    .query(
                        query_embedding,
                        &ChunkFilter::episode(episode_id).scored_by(variant),
                        self.top_k,
                    )
                    .await
                {
                    Ok(found) => found,
                    Err(e) => {
                        warn!("Episode-wide context lookup for {} failed: {}", episode_id, e);
                        Vec::new()
                    }
                }
            }
        };

        let fragments = merge_fragments(chunks.into_iter().map(|s| s.chunk).collect());
        debug!(
            "Context window for {} @ {:.1}s has {} fragments",
            episode_id,
            start,
            fragments.len()
        );

        ContextWindow {
            episode_id: episode_id.to_string(),
            fragments,
        }
    }
}
