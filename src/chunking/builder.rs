//! Greedy word-count chunking with a sentence-level fallback.
//!
//! Lines accumulate until the buffer holds at least `min_words` and the next
//! line would push it past `max_words`; the buffer then becomes one chunk.
//! A line that alone exceeds `max_words` is fed in sentence by sentence under
//! the same rule, so its pieces may share a start time with each other and
//! with the preceding lines. Whatever remains after the last line is always
//! emitted, even below `min_words`.
//!
//! A single sentence longer than `max_words` is emitted as an oversized chunk;
//! nothing is split below sentence granularity.

use super::metadata::aggregate;
use super::{Chunk, ChunkingConfig, SentenceSplitter};
use crate::error::Result;
use crate::transcript::{group_by_episode, word_count, TranscriptLine};
use std::sync::Arc;
use tracing::debug;

/// Output of one build: the chunks and the index the next chunk would take.
#[derive(Debug, Clone)]
pub struct ChunkBatch {
    pub chunks: Vec<Chunk>,
    pub next_index: u32,
}

/// Chunk builder for the lines of one episode.
pub struct ChunkBuilder {
    config: ChunkingConfig,
    splitter: Arc<dyn SentenceSplitter>,
}

/// Text accumulated for the chunk currently being built.
#[derive(Default)]
struct Pending<'a> {
    lines: Vec<&'a TranscriptLine>,
    texts: Vec<String>,
    labeled: Vec<String>,
    words: usize,
}

impl<'a> Pending<'a> {
    fn push(&mut self, line: &'a TranscriptLine, text: &str, words: usize) {
        let already_backing = self
            .lines
            .last()
            .is_some_and(|last| std::ptr::eq(*last, line));
        if !already_backing {
            self.lines.push(line);
        }
        self.texts.push(text.to_string());
        self.labeled.push(format!("{}: {}", line.speaker, text));
        self.words += words;
    }

    fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    fn is_full_before(&self, incoming: usize, config: &ChunkingConfig) -> bool {
        self.words + incoming > config.max_words && self.words >= config.min_words
    }
}

impl ChunkBuilder {
    /// Create a builder; fails if the word bounds are inconsistent.
    pub fn new(config: ChunkingConfig, splitter: Arc<dyn SentenceSplitter>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, splitter })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Chunk lines of any number of episodes; indices restart at zero per episode.
    pub fn build_episodes(&self, lines: Vec<TranscriptLine>) -> Vec<Chunk> {
        group_by_episode(lines)
            .iter()
            .flat_map(|episode| self.build(&episode.lines, 0).chunks)
            .collect()
    }

    /// Chunk the ordered lines of one episode, numbering from `start_index`.
    pub fn build(&self, lines: &[TranscriptLine], start_index: u32) -> ChunkBatch {
        let mut chunks = Vec::new();
        let mut next_index = start_index;
        let mut pending = Pending::default();

        for line in lines {
            let words = line.word_count();

            if words > self.config.max_words {
                let mut sentences = self.splitter.split(&line.line_text);
                if sentences.is_empty() {
                    sentences.push(line.line_text.trim().to_string());
                }
                debug!(
                    "Line at {:.1}s has {} words, packing {} sentences",
                    line.start_time_seconds,
                    words,
                    sentences.len()
                );

                for sentence in &sentences {
                    let sentence_words = word_count(sentence);
                    if pending.is_full_before(sentence_words, &self.config) {
                        self.emit(&mut pending, &mut next_index, &mut chunks);
                    }
                    pending.push(line, sentence, sentence_words);
                }
            } else {
                if pending.is_full_before(words, &self.config) {
                    self.emit(&mut pending, &mut next_index, &mut chunks);
                }
                pending.push(line, line.line_text.trim(), words);
            }
        }

        if !pending.is_empty() {
            self.emit(&mut pending, &mut next_index, &mut chunks);
        }

        ChunkBatch { chunks, next_index }
    }

    fn emit(&self, pending: &mut Pending<'_>, next_index: &mut u32, chunks: &mut Vec<Chunk>) {
        let draft = std::mem::take(pending);
        let Some(first) = draft.lines.first() else {
            return;
        };

        let text = draft.texts.join(" ");
        let text_with_speaker = draft.labeled.join(" ");
        let chunk_id = self
            .config
            .id_strategy
            .chunk_id(first.episode_id(), *next_index, &text);

        if let Some(chunk) = aggregate(&draft.lines, text, text_with_speaker, *next_index, chunk_id) {
            chunks.push(chunk);
            *next_index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{ChunkIdStrategy, PunctuationSplitter};
    use crate::error::PodsiftError;
    use crate::transcript::{EpisodeInfo, EpisodeMetrics};

    fn words(n: usize, tag: &str) -> String {
        (0..n).map(|i| format!("{}{}", tag, i)).collect::<Vec<_>>().join(" ")
    }

    /// `count` sentences of `per_sentence` words each.
    fn sentences(count: usize, per_sentence: usize) -> String {
        (0..count)
            .map(|s| format!("{}.", words(per_sentence, &format!("s{}w", s))))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn line(start: f64, speaker: &str, text: String) -> TranscriptLine {
        TranscriptLine {
            episode: EpisodeInfo {
                episode_id: "ep1".to_string(),
                episode_name: "Episode One".to_string(),
                ..Default::default()
            },
            speaker: speaker.to_string(),
            line_text: text,
            start_time_seconds: start,
            end_time_seconds: start + 9.0,
            metrics: EpisodeMetrics::default(),
        }
    }

    fn builder(min_words: usize, max_words: usize) -> ChunkBuilder {
        let config = ChunkingConfig {
            min_words,
            max_words,
            ..Default::default()
        };
        ChunkBuilder::new(config, Arc::new(PunctuationSplitter::new())).unwrap()
    }

    #[test]
    fn test_empty_input() {
        let batch = builder(100, 200).build(&[], 7);
        assert!(batch.chunks.is_empty());
        assert_eq!(batch.next_index, 7);
    }

    #[test]
    fn test_small_episode_is_one_chunk() {
        let lines: Vec<_> = (0..10)
            .map(|i| line(i as f64 * 10.0, "Host", words(15, &format!("l{}w", i))))
            .collect();

        let batch = builder(100, 200).build(&lines, 0);

        assert_eq!(batch.chunks.len(), 1);
        let chunk = &batch.chunks[0];
        assert_eq!(chunk.word_count(), 150);
        assert_eq!(chunk.start_time, 0.0);
        assert_eq!(chunk.end_time, 99.0);
        assert!(chunk.text.starts_with("l0w0"));
        assert!(chunk.text.ends_with("l9w14"));
        assert_eq!(batch.next_index, 1);
    }

    #[test]
    fn test_flushes_before_exceeding_max() {
        let lines: Vec<_> = (0..4)
            .map(|i| line(i as f64 * 10.0, "Host", words(80, &format!("l{}w", i))))
            .collect();

        let batch = builder(100, 200).build(&lines, 0);

        assert_eq!(batch.chunks.len(), 2);
        assert_eq!(batch.chunks[0].word_count(), 160);
        assert_eq!(batch.chunks[0].end_time, 19.0);
        assert_eq!(batch.chunks[1].start_time, 20.0);
        assert_eq!(batch.chunks[1].word_count(), 160);
    }

    #[test]
    fn test_under_min_buffer_keeps_growing() {
        let lines = vec![
            line(0.0, "Host", words(50, "a")),
            line(10.0, "Guest", words(170, "b")),
            line(20.0, "Host", words(10, "c")),
        ];

        let batch = builder(100, 200).build(&lines, 0);

        // 50 words is below the minimum, so the 170-word line joins it.
        assert_eq!(batch.chunks.len(), 2);
        assert_eq!(batch.chunks[0].word_count(), 220);
        assert_eq!(batch.chunks[1].word_count(), 10);
        for chunk in &batch.chunks[..batch.chunks.len() - 1] {
            assert!(chunk.word_count() >= 100);
        }
    }

    #[test]
    fn test_oversized_line_split_at_sentences() {
        let lines = vec![line(30.0, "Guest", sentences(25, 10))];

        let batch = builder(100, 200).build(&lines, 0);

        assert!(batch.chunks.len() >= 2);
        for chunk in &batch.chunks {
            assert!(chunk.word_count() <= 200);
            assert!(chunk.text.ends_with('.'));
            assert_eq!(chunk.start_time, 30.0);
            assert_eq!(chunk.end_time, 39.0);
        }
        assert_eq!(batch.chunks[0].word_count(), 200);
        assert_eq!(batch.chunks[1].word_count(), 50);
        assert!(batch.chunks[1]
            .text_with_speaker
            .starts_with("Guest: s20w0"));
    }

    #[test]
    fn test_oversized_line_continues_pending_lines() {
        let lines = vec![
            line(0.0, "Host", words(30, "h")),
            line(10.0, "Guest", sentences(25, 10)),
            line(20.0, "Host", words(5, "t")),
        ];

        let batch = builder(100, 200).build(&lines, 0);

        assert_eq!(batch.chunks.len(), 2);
        let first = &batch.chunks[0];
        assert_eq!(first.word_count(), 200);
        assert_eq!(first.start_time, 0.0);
        assert_eq!(first.end_time, 19.0);
        assert!(first.speaker.contains("Host") && first.speaker.contains("Guest"));

        let second = &batch.chunks[1];
        assert_eq!(second.start_time, 10.0);
        assert_eq!(second.end_time, 29.0);
        assert_eq!(second.word_count(), 85);
    }

    #[test]
    fn test_unsplittable_sentence_becomes_oversized_chunk() {
        let lines = vec![
            line(0.0, "Host", words(120, "a")),
            line(10.0, "Guest", words(250, "b")),
        ];

        let batch = builder(100, 200).build(&lines, 0);

        assert_eq!(batch.chunks.len(), 2);
        assert_eq!(batch.chunks[0].word_count(), 120);
        assert_eq!(batch.chunks[1].word_count(), 250);
    }

    #[test]
    fn test_indices_strictly_increase_from_counter() {
        let lines: Vec<_> = (0..12)
            .map(|i| {
                let text = if i % 5 == 0 {
                    sentences(30, 9)
                } else {
                    words(70, &format!("l{}w", i))
                };
                line(i as f64 * 10.0, "Host", text)
            })
            .collect();

        let batch = builder(100, 200).build(&lines, 40);

        assert!(batch.chunks.len() > 3);
        assert_eq!(batch.chunks[0].chunk_index, 40);
        for pair in batch.chunks.windows(2) {
            assert_eq!(pair[1].chunk_index, pair[0].chunk_index + 1);
        }
        assert_eq!(
            batch.next_index,
            batch.chunks.last().unwrap().chunk_index + 1
        );
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let lines: Vec<_> = (0..8)
            .map(|i| line(i as f64 * 10.0, "Host", sentences(4, 12)))
            .collect();
        let builder = builder(100, 200);

        let first = builder.build(&lines, 0);
        let second = builder.build(&lines, 0);

        assert_eq!(first.chunks.len(), second.chunks.len());
        for (a, b) in first.chunks.iter().zip(&second.chunks) {
            assert_eq!(a.chunk_index, b.chunk_index);
            assert_eq!(a.text, b.text);
            assert_eq!(a.text_with_speaker, b.text_with_speaker);
            assert_eq!(a.start_time, b.start_time);
            assert_eq!(a.end_time, b.end_time);
            assert_ne!(a.chunk_id, b.chunk_id);
        }
    }

    #[test]
    fn test_stable_ids_repeat_across_builds() {
        let config = ChunkingConfig {
            id_strategy: ChunkIdStrategy::ContentDerived,
            ..Default::default()
        };
        let builder = ChunkBuilder::new(config, Arc::new(PunctuationSplitter::new())).unwrap();
        let lines = vec![line(0.0, "Host", words(40, "x"))];

        let a = builder.build(&lines, 0);
        let b = builder.build(&lines, 0);
        assert_eq!(a.chunks[0].chunk_id, b.chunks[0].chunk_id);
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let config = ChunkingConfig {
            min_words: 50,
            max_words: 10,
            ..Default::default()
        };
        assert!(matches!(
            ChunkBuilder::new(config, Arc::new(PunctuationSplitter::new())),
            Err(PodsiftError::Chunking(_))
        ));
    }
}
