//! Ingestion pipeline for Podsift.
//!
//! Coordinates the offline path from transcript lines to indexed chunks:
//! group lines per episode, build chunks, embed them and write them to the
//! similarity index.

use crate::chunking::{Chunk, ChunkBuilder, ChunkingConfig, PunctuationSplitter};
use crate::config::Settings;
use crate::embedding::{embedding_text, Embedder, EmbeddingVariant, OpenAIEmbedder};
use crate::error::{PodsiftError, Result};
use crate::transcript::{group_by_episode, load_lines, EpisodeLines, TranscriptLine};
use crate::vector_store::{open_index, IndexedChunk, SimilarityIndex};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// The main orchestrator for the ingestion pipeline.
pub struct Orchestrator {
    settings: Settings,
    builder: ChunkBuilder,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn SimilarityIndex>,
}

impl Orchestrator {
    /// Create an orchestrator from configuration.
    pub fn new(settings: Settings) -> Result<Self> {
        let embedder = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding)?);
        let index = open_index(&settings)?;
        Self::with_components(settings, embedder, index)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn SimilarityIndex>,
    ) -> Result<Self> {
        let builder = ChunkBuilder::new(
            ChunkingConfig::from(&settings.chunking),
            Arc::new(PunctuationSplitter::new()),
        )?;

        Ok(Self {
            settings,
            builder,
            embedder,
            index,
        })
    }

    /// Get a reference to the similarity index.
    pub fn index(&self) -> Arc<dyn SimilarityIndex> {
        self.index.clone()
    }

    /// Get a reference to the embedder.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Chunk lines offline, without embedding or indexing.
    ///
    /// Each episode's chunk indices start at zero.
    pub fn chunk_lines(&self, lines: Vec<TranscriptLine>) -> Vec<Chunk> {
        self.builder.build_episodes(lines)
    }

    /// Load a transcript file and index every episode in it.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn ingest_file(&self, path: &Path, force: bool) -> Result<IngestReport> {
        let lines = load_lines(path)?;
        Ok(self.ingest_lines(lines, force).await)
    }

    /// Index every episode in `lines`.
    ///
    /// Episodes are processed concurrently; one episode failing is recorded
    /// in the report and does not stop the others.
    pub async fn ingest_lines(&self, lines: Vec<TranscriptLine>, force: bool) -> IngestReport {
        let episodes = group_by_episode(lines);
        info!("Ingesting {} episodes", episodes.len());

        let reports = stream::iter(episodes)
            .map(|episode| self.ingest_episode(episode, force))
            .buffered(self.settings.ingest.max_concurrent_episodes.max(1))
            .collect()
            .await;

        let report = IngestReport { episodes: reports };
        info!(
            "Ingestion finished: {} indexed, {} skipped, {} failed, {} chunks",
            report.indexed(),
            report.skipped(),
            report.failed(),
            report.chunks_indexed()
        );
        report
    }

    async fn ingest_episode(&self, episode: EpisodeLines, force: bool) -> EpisodeReport {
        let episode_id = episode.episode_id.clone();
        let episode_name = episode.episode_name().to_string();

        let status = match self.try_ingest_episode(&episode, force).await {
            Ok(status) => status,
            Err(e) => {
                warn!("Failed to ingest episode {}: {}", episode_id, e);
                EpisodeStatus::Failed {
                    error: e.to_string(),
                }
            }
        };

        EpisodeReport {
            episode_id,
            episode_name,
            status,
        }
    }

    async fn try_ingest_episode(&self, episode: &EpisodeLines, force: bool) -> Result<EpisodeStatus> {
        if !force && self.index.is_episode_indexed(&episode.episode_id).await? {
            info!("Episode {} is already indexed, skipping", episode.episode_id);
            return Ok(EpisodeStatus::Skipped);
        }

        if let Err(e) = self
            .index
            .store_lines(&episode.episode_id, &episode.lines)
            .await
        {
            warn!(
                "Failed to store lines for {} (rechunking won't be available): {}",
                episode.episode_id, e
            );
        }

        let chunks = self
            .index_episode(&episode.episode_id, &episode.lines)
            .await?;
        Ok(EpisodeStatus::Indexed { chunks })
    }

    /// Chunk, embed and index one episode, replacing its previous chunks.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    async fn index_episode(&self, episode_id: &str, lines: &[TranscriptLine]) -> Result<usize> {
        let batch = self.builder.build(lines, 0);
        let chunks: Vec<Chunk> = batch
            .chunks
            .into_iter()
            .filter(|c| !c.text.trim().is_empty())
            .collect();
        debug!("Built {} chunks for episode {}", chunks.len(), episode_id);

        if chunks.is_empty() {
            self.index.delete_episode(episode_id).await?;
            return Ok(0);
        }

        let embeddings = self
            .embed_chunks(episode_id, &chunks, EmbeddingVariant::Text)
            .await?;
        let mut speaker_embeddings = if self.settings.embedding.speaker_embeddings {
            Some(
                self.embed_chunks(episode_id, &chunks, EmbeddingVariant::Speaker)
                    .await?
                    .into_iter(),
            )
        } else {
            None
        };

        let max_chars = self.settings.vector_store.max_metadata_chars;
        let indexed: Vec<IndexedChunk> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                let indexed = IndexedChunk::new(chunk.truncated_for_storage(max_chars), embedding);
                match speaker_embeddings.as_mut().and_then(Iterator::next) {
                    Some(speaker) => indexed.with_speaker_embedding(speaker),
                    None => indexed,
                }
            })
            .collect();

        self.index.delete_episode(episode_id).await?;
        self.index.upsert_batch(&indexed).await
    }

    /// Embed one text form of every chunk, in chunk order.
    async fn embed_chunks(
        &self,
        episode_id: &str,
        chunks: &[Chunk],
        variant: EmbeddingVariant,
    ) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<String> = chunks
            .iter()
            .map(|c| embedding_text(c, variant).to_string())
            .collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(PodsiftError::Embedding(format!(
                "Expected {} {:?} embeddings for episode {}, got {}",
                chunks.len(),
                variant,
                episode_id,
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }

    /// Rebuild an episode's chunks from its stored lines with current settings.
    #[instrument(skip(self))]
    pub async fn rechunk_episode(&self, episode_id: &str) -> Result<EpisodeReport> {
        let lines = self.index.get_lines(episode_id).await?.ok_or_else(|| {
            PodsiftError::EpisodeNotFound(format!(
                "No stored lines for '{}'. Lines are stored when an episode is ingested.",
                episode_id
            ))
        })?;

        let episode_name = lines
            .first()
            .map(|l| l.episode.episode_name.clone())
            .unwrap_or_default();
        info!("Rechunking '{}' from {} stored lines", episode_id, lines.len());

        let chunks = self.index_episode(episode_id, &lines).await?;

        Ok(EpisodeReport {
            episode_id: episode_id.to_string(),
            episode_name,
            status: EpisodeStatus::Indexed { chunks },
        })
    }

    /// Rebuild every episode with stored lines.
    pub async fn rechunk_all(&self) -> Result<IngestReport> {
        let mut episodes = Vec::new();
        for episode_id in self.list_rechunkable().await? {
            let report = match self.rechunk_episode(&episode_id).await {
                Ok(report) => report,
                Err(e) => {
                    warn!("Failed to rechunk {}: {}", episode_id, e);
                    EpisodeReport {
                        episode_id,
                        episode_name: String::new(),
                        status: EpisodeStatus::Failed {
                            error: e.to_string(),
                        },
                    }
                }
            };
            episodes.push(report);
        }
        Ok(IngestReport { episodes })
    }

    /// List all episodes that have stored lines (available for rechunking).
    pub async fn list_rechunkable(&self) -> Result<Vec<String>> {
        self.index.list_stored_episodes().await
    }
}

/// What happened to one episode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EpisodeStatus {
    Indexed { chunks: usize },
    /// Already indexed and not forced.
    Skipped,
    Failed { error: String },
}

/// Result of processing one episode.
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeReport {
    pub episode_id: String,
    pub episode_name: String,
    #[serde(flatten)]
    pub status: EpisodeStatus,
}

/// Result of an ingestion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub episodes: Vec<EpisodeReport>,
}

impl IngestReport {
    pub fn indexed(&self) -> usize {
        self.count(|s| matches!(s, EpisodeStatus::Indexed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, EpisodeStatus::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, EpisodeStatus::Failed { .. }))
    }

    /// Total chunks written across all episodes.
    pub fn chunks_indexed(&self) -> usize {
        self.episodes
            .iter()
            .map(|e| match e.status {
                EpisodeStatus::Indexed { chunks } => chunks,
                _ => 0,
            })
            .sum()
    }

    fn count(&self, pred: impl Fn(&EpisodeStatus) -> bool) -> usize {
        self.episodes.iter().filter(|e| pred(&e.status)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::{ChunkFilter, SqliteVectorStore};
    use async_trait::async_trait;

    /// Embeds a text as its word count; fails on texts containing "FAIL".
    struct WordCountEmbedder;

    #[async_trait]
    impl Embedder for WordCountEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains("FAIL") {
                return Err(PodsiftError::Embedding("upstream timeout".to_string()));
            }
            Ok(vec![text.split_whitespace().count() as f32, 1.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn line(episode_id: &str, start: f64, words: usize, marker: &str) -> TranscriptLine {
        let text = (0..words)
            .map(|i| format!("{}{}", marker, i))
            .collect::<Vec<_>>()
            .join(" ");
        serde_json::from_value(serde_json::json!({
            "episode_id": episode_id,
            "episode_name": format!("Episode {}", episode_id),
            "release_date": "2023-04-01",
            "guest_name": "Jane Doe",
            "speaker": "Host",
            "line_text": text,
            "start_time_seconds": start,
            "end_time_seconds": start + 5.0,
            "views": 1000
        }))
        .unwrap()
    }

    fn sample_lines() -> Vec<TranscriptLine> {
        let mut lines = Vec::new();
        for i in 0..6 {
            lines.push(line("ep1", i as f64 * 5.0, 60, "w"));
        }
        for i in 0..3 {
            lines.push(line("ep2", i as f64 * 5.0, 20, "v"));
        }
        lines
    }

    fn orchestrator(settings: Settings, index: Arc<dyn SimilarityIndex>) -> Orchestrator {
        Orchestrator::with_components(settings, Arc::new(WordCountEmbedder), index).unwrap()
    }

    #[tokio::test]
    async fn test_ingest_and_skip() {
        let index: Arc<dyn SimilarityIndex> = Arc::new(SqliteVectorStore::in_memory().unwrap());
        let orchestrator = orchestrator(Settings::default(), index.clone());

        let report = orchestrator.ingest_lines(sample_lines(), false).await;
        assert_eq!(report.indexed(), 2);
        assert_eq!(report.failed(), 0);
        // ep1: 360 words in 60-word lines packs 180 + 180; ep2: 60 words in one chunk.
        assert_eq!(report.chunks_indexed(), 3);
        assert_eq!(index.chunk_count().await.unwrap(), 3);

        let chunks = index.fetch(&ChunkFilter::episode("ep1"), 10).await.unwrap();
        assert_eq!(
            chunks.iter().map(|c| c.chunk_index).collect::<Vec<_>>(),
            vec![0, 1]
        );
        assert_eq!(chunks[0].metrics.views, Some(1000));

        let again = orchestrator.ingest_lines(sample_lines(), false).await;
        assert_eq!(again.skipped(), 2);
        assert_eq!(index.chunk_count().await.unwrap(), 3);

        let forced = orchestrator.ingest_lines(sample_lines(), true).await;
        assert_eq!(forced.indexed(), 2);
        assert_eq!(index.chunk_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_failed_episode_does_not_stop_batch() {
        let index: Arc<dyn SimilarityIndex> = Arc::new(SqliteVectorStore::in_memory().unwrap());
        let orchestrator = orchestrator(Settings::default(), index.clone());

        let mut lines = sample_lines();
        lines.push(line("ep3", 0.0, 10, "FAIL"));

        let report = orchestrator.ingest_lines(lines, false).await;
        assert_eq!(report.indexed(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.episodes[2].episode_id, "ep3");
        assert!(!index.is_episode_indexed("ep3").await.unwrap());
    }

    #[tokio::test]
    async fn test_stored_text_is_truncated() {
        let index: Arc<dyn SimilarityIndex> = Arc::new(SqliteVectorStore::in_memory().unwrap());
        let mut settings = Settings::default();
        settings.vector_store.max_metadata_chars = 20;
        let orchestrator = orchestrator(settings, index.clone());

        orchestrator.ingest_lines(sample_lines(), false).await;

        let chunks = index.fetch(&ChunkFilter::episode("ep2"), 10).await.unwrap();
        assert_eq!(chunks[0].text.chars().count(), 20);
        assert_eq!(chunks[0].episode_id(), "ep2");
    }

    #[tokio::test]
    async fn test_rechunk_with_new_bounds() {
        let index: Arc<dyn SimilarityIndex> = Arc::new(SqliteVectorStore::in_memory().unwrap());
        orchestrator(Settings::default(), index.clone())
            .ingest_lines(sample_lines(), false)
            .await;

        let mut settings = Settings::default();
        settings.chunking.min_words = 50;
        settings.chunking.max_words = 60;
        let rechunker = orchestrator(settings, index.clone());

        assert_eq!(rechunker.list_rechunkable().await.unwrap(), vec!["ep1", "ep2"]);

        let report = rechunker.rechunk_episode("ep1").await.unwrap();
        assert_eq!(report.status, EpisodeStatus::Indexed { chunks: 6 });
        assert_eq!(report.episode_name, "Episode ep1");

        let all = rechunker.rechunk_all().await.unwrap();
        assert_eq!(all.indexed(), 2);

        let missing = rechunker.rechunk_episode("nope").await;
        assert!(matches!(missing, Err(PodsiftError::EpisodeNotFound(_))));
    }

    /// Scores of the ep2 chunk for a fixed query over both variants.
    async fn variant_scores(index: &dyn SimilarityIndex) -> (f32, f32) {
        let query = [0.0, 1.0];
        let text = index
            .query(&query, &ChunkFilter::episode("ep2"), 1)
            .await
            .unwrap();
        let speaker = index
            .query(
                &query,
                &ChunkFilter::episode("ep2").scored_by(EmbeddingVariant::Speaker),
                1,
            )
            .await
            .unwrap();
        (text[0].score, speaker[0].score)
    }

    #[tokio::test]
    async fn test_speaker_labelled_text_is_embedded_separately() {
        let index: Arc<dyn SimilarityIndex> = Arc::new(SqliteVectorStore::in_memory().unwrap());
        orchestrator(Settings::default(), index.clone())
            .ingest_lines(sample_lines(), false)
            .await;

        // The labelled form carries a "Host:" prefix per line, so its word count differs.
        let (text, speaker) = variant_scores(index.as_ref()).await;
        assert!((text - speaker).abs() > 1e-6);

        let mut settings = Settings::default();
        settings.embedding.speaker_embeddings = false;
        orchestrator(settings, index.clone())
            .ingest_lines(sample_lines(), true)
            .await;

        let (text, speaker) = variant_scores(index.as_ref()).await;
        assert_eq!(text, speaker);
    }

    #[test]
    fn test_chunk_lines_restarts_indices_per_episode() {
        let index: Arc<dyn SimilarityIndex> = Arc::new(SqliteVectorStore::in_memory().unwrap());
        let orchestrator = orchestrator(Settings::default(), index);

        let chunks = orchestrator.chunk_lines(sample_lines());
        let positions: Vec<(&str, u32)> = chunks
            .iter()
            .map(|c| (c.episode_id(), c.chunk_index))
            .collect();
        assert_eq!(positions, vec![("ep1", 0), ("ep1", 1), ("ep2", 0)]);
    }
}
