//! In-memory similarity index.
//!
//! Useful for testing and small datasets.

use super::{
    cosine_similarity, sort_by_position, ChunkFilter, IndexedChunk, IndexedEpisode, ScoredChunk,
    SimilarityIndex,
};
use crate::chunking::Chunk;
use crate::error::{PodsiftError, Result};
use crate::transcript::TranscriptLine;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    chunks: HashMap<Uuid, IndexedChunk>,
    lines: HashMap<String, Vec<TranscriptLine>>,
}

/// In-memory vector store.
pub struct MemoryVectorStore {
    inner: RwLock<Inner>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| PodsiftError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| PodsiftError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SimilarityIndex for MemoryVectorStore {
    async fn upsert_batch(&self, chunks: &[IndexedChunk]) -> Result<usize> {
        let mut store = self.write()?;
        for indexed in chunks {
            store.chunks.insert(indexed.chunk.chunk_id, indexed.clone());
        }
        Ok(chunks.len())
    }

    async fn query(
        &self,
        embedding: &[f32],
        filter: &ChunkFilter,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let store = self.read()?;

        let mut results: Vec<ScoredChunk> = store
            .chunks
            .values()
            .filter(|c| filter.matches(&c.chunk))
            .map(|c| ScoredChunk {
                chunk: c.chunk.clone(),
                score: cosine_similarity(embedding, c.embedding_for(filter.variant)),
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);
        Ok(results)
    }

    async fn fetch(&self, filter: &ChunkFilter, limit: usize) -> Result<Vec<Chunk>> {
        let store = self.read()?;
        let mut chunks: Vec<Chunk> = store
            .chunks
            .values()
            .filter(|c| filter.matches(&c.chunk))
            .map(|c| c.chunk.clone())
            .collect();
        sort_by_position(&mut chunks);
        chunks.truncate(limit);
        Ok(chunks)
    }

    async fn delete_episode(&self, episode_id: &str) -> Result<usize> {
        let mut store = self.write()?;
        let initial_len = store.chunks.len();
        store.chunks.retain(|_, c| c.chunk.episode_id() != episode_id);
        Ok(initial_len - store.chunks.len())
    }

    async fn list_episodes(&self) -> Result<Vec<IndexedEpisode>> {
        let store = self.read()?;

        let mut episodes: HashMap<&str, IndexedEpisode> = HashMap::new();
        for indexed in store.chunks.values() {
            let chunk = &indexed.chunk;
            let entry = episodes
                .entry(chunk.episode_id())
                .or_insert_with(|| IndexedEpisode {
                    episode_id: chunk.episode_id().to_string(),
                    episode_name: chunk.episode.episode_name.clone(),
                    guest_name: chunk.episode.guest_name.clone(),
                    release_date: chunk.episode.release_date.clone(),
                    chunk_count: 0,
                    total_duration_seconds: 0.0,
                    indexed_at: indexed.indexed_at,
                });

            entry.chunk_count += 1;
            entry.total_duration_seconds = entry.total_duration_seconds.max(chunk.end_time);
            entry.indexed_at = entry.indexed_at.max(indexed.indexed_at);
        }

        let mut episodes: Vec<IndexedEpisode> = episodes.into_values().collect();
        episodes.sort_by(|a, b| b.indexed_at.cmp(&a.indexed_at));
        Ok(episodes)
    }

    async fn is_episode_indexed(&self, episode_id: &str) -> Result<bool> {
        let store = self.read()?;
        Ok(store
            .chunks
            .values()
            .any(|c| c.chunk.episode_id() == episode_id))
    }

    async fn chunk_count(&self) -> Result<usize> {
        Ok(self.read()?.chunks.len())
    }

    async fn store_lines(&self, episode_id: &str, lines: &[TranscriptLine]) -> Result<()> {
        self.write()?
            .lines
            .insert(episode_id.to_string(), lines.to_vec());
        Ok(())
    }

    async fn get_lines(&self, episode_id: &str) -> Result<Option<Vec<TranscriptLine>>> {
        Ok(self.read()?.lines.get(episode_id).cloned())
    }

    async fn list_stored_episodes(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.read()?.lines.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
