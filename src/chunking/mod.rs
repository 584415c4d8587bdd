//! Chunking of diarized transcripts into embeddable segments.
//!
//! Lines of one episode are packed greedily into word-bounded chunks. Lines
//! too long to embed whole fall back to sentence-level packing through an
//! injected [`SentenceSplitter`].

mod builder;
pub mod metadata;
mod sentence;

pub use builder::{ChunkBatch, ChunkBuilder};
pub use sentence::{PunctuationSplitter, SentenceSplitter};

use crate::config::ChunkingSettings;
use crate::error::{PodsiftError, Result};
use crate::transcript::{format_timestamp, word_count, EpisodeInfo, EpisodeMetrics};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for content-derived chunk IDs.
const CHUNK_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1d_2c0a_8b3e_4d5f_9a71_c2e4_0b6d_13a8);

/// A bounded-size contiguous transcript segment; the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Opaque unique ID.
    pub chunk_id: Uuid,
    /// Position within the episode, strictly increasing.
    pub chunk_index: u32,
    /// Text without speaker labels.
    pub text: String,
    /// Text with each line or sentence prefixed by its speaker.
    pub text_with_speaker: String,
    /// Start of the first backing line, in seconds.
    pub start_time: f64,
    /// End of the last backing line, in seconds.
    pub end_time: f64,
    pub original_start_time: f64,
    pub original_end_time: f64,
    #[serde(flatten)]
    pub episode: EpisodeInfo,
    /// Speakers of the backing lines, joined with `" / "`.
    pub speaker: String,
    #[serde(flatten)]
    pub metrics: EpisodeMetrics,
}

impl Chunk {
    pub fn episode_id(&self) -> &str {
        &self.episode.episode_id
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.text)
    }

    /// Duration of this chunk in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Format the start time for display.
    pub fn format_timestamp(&self) -> String {
        format_timestamp(self.start_time)
    }

    /// Watch link that jumps to the start of this chunk.
    pub fn watch_url(&self) -> String {
        format!(
            "https://youtube.com/watch?v={}&t={}s",
            self.episode.episode_id,
            self.start_time.max(0.0) as u64
        )
    }

    /// Copy with every long text field cut to `max_chars` characters.
    ///
    /// Applied when the chunk is written to the index; `episode_id` is kept
    /// intact because it is an exact-match filter key.
    pub fn truncated_for_storage(&self, max_chars: usize) -> Chunk {
        let cut = |s: &str| metadata::truncate_chars(s, max_chars);
        let cut_opt = |s: &Option<String>| s.as_deref().map(cut);

        Chunk {
            text: cut(&self.text),
            text_with_speaker: cut(&self.text_with_speaker),
            speaker: cut(&self.speaker),
            episode: EpisodeInfo {
                episode_id: self.episode.episode_id.clone(),
                episode_name: cut(&self.episode.episode_name),
                release_date: cut_opt(&self.episode.release_date),
                guest_name: cut_opt(&self.episode.guest_name),
                episode_description: cut_opt(&self.episode.episode_description),
            },
            ..self.clone()
        }
    }
}

/// How chunk IDs are generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChunkIdStrategy {
    /// Fresh random UUID per build; re-ingestion yields new identities.
    #[default]
    Random,
    /// UUIDv5 over episode ID, chunk index and text; stable across re-ingestion.
    ContentDerived,
}

impl ChunkIdStrategy {
    pub fn chunk_id(&self, episode_id: &str, chunk_index: u32, text: &str) -> Uuid {
        match self {
            ChunkIdStrategy::Random => Uuid::new_v4(),
            ChunkIdStrategy::ContentDerived => {
                let name = format!("{}\u{1f}{}\u{1f}{}", episode_id, chunk_index, text);
                Uuid::new_v5(&CHUNK_ID_NAMESPACE, name.as_bytes())
            }
        }
    }
}

/// Word bounds for chunking.
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// A chunk is only closed once it holds at least this many words.
    pub min_words: usize,
    /// A chunk is closed before it would grow past this many words.
    pub max_words: usize,
    pub id_strategy: ChunkIdStrategy,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_words: 100,
            max_words: 200,
            id_strategy: ChunkIdStrategy::Random,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_words == 0 {
            return Err(PodsiftError::Chunking(
                "chunking.max_words must be greater than zero".to_string(),
            ));
        }
        if self.min_words > self.max_words {
            return Err(PodsiftError::Chunking(format!(
                "chunking.min_words ({}) must not exceed chunking.max_words ({})",
                self.min_words, self.max_words
            )));
        }
        Ok(())
    }
}

impl From<&ChunkingSettings> for ChunkingConfig {
    fn from(settings: &ChunkingSettings) -> Self {
        Self {
            min_words: settings.min_words,
            max_words: settings.max_words,
            id_strategy: if settings.stable_ids {
                ChunkIdStrategy::ContentDerived
            } else {
                ChunkIdStrategy::Random
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunk() -> Chunk {
        Chunk {
            chunk_id: Uuid::new_v4(),
            chunk_index: 3,
            text: "é".repeat(600),
            text_with_speaker: format!("Host: {}", "a".repeat(600)),
            start_time: 125.7,
            end_time: 140.0,
            original_start_time: 125.7,
            original_end_time: 140.0,
            episode: EpisodeInfo {
                episode_id: "x".repeat(600),
                episode_name: "Short".to_string(),
                release_date: Some("2023-01-01".to_string()),
                guest_name: None,
                episode_description: Some("d".repeat(501)),
            },
            speaker: "Host".to_string(),
            metrics: EpisodeMetrics::default(),
        }
    }

    #[test]
    fn test_truncated_for_storage() {
        let chunk = sample_chunk();
        let stored = chunk.truncated_for_storage(500);

        assert_eq!(stored.text.chars().count(), 500);
        assert_eq!(stored.text_with_speaker.chars().count(), 500);
        assert_eq!(stored.episode.episode_description.unwrap().len(), 500);
        assert_eq!(stored.episode.episode_name, "Short");
        assert_eq!(stored.episode.episode_id.len(), 600);
        assert_eq!(stored.chunk_id, chunk.chunk_id);
    }

    #[test]
    fn test_timestamp_and_url() {
        let chunk = sample_chunk();
        assert_eq!(chunk.format_timestamp(), "02:05");
        assert!(chunk.watch_url().ends_with("&t=125s"));
    }

    #[test]
    fn test_content_derived_ids_are_stable() {
        let strategy = ChunkIdStrategy::ContentDerived;
        let a = strategy.chunk_id("ep1", 0, "hello");
        let b = strategy.chunk_id("ep1", 0, "hello");
        let c = strategy.chunk_id("ep1", 1, "hello");
        assert_eq!(a, b);
        assert_ne!(a, c);

        let random = ChunkIdStrategy::Random;
        assert_ne!(random.chunk_id("ep1", 0, "hello"), random.chunk_id("ep1", 0, "hello"));
    }

    #[test]
    fn test_config_validation() {
        assert!(ChunkingConfig::default().validate().is_ok());

        let inverted = ChunkingConfig {
            min_words: 300,
            max_words: 200,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());
    }
}
