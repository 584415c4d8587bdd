//! Deriving a chunk's metadata from the lines backing it.

use super::Chunk;
use crate::transcript::{EpisodeMetrics, TranscriptLine};
use uuid::Uuid;

/// Separator between speaker names in [`Chunk::speaker`].
pub const SPEAKER_DELIMITER: &str = " / ";

/// Character ceiling for text fields written to the index.
pub const DEFAULT_MAX_METADATA_CHARS: usize = 500;

/// Build a chunk from its ordered backing lines.
///
/// Identity fields come from the first line, the time span runs from the
/// first line's start to the last line's end, and each metric takes the first
/// non-null value in line order. Returns `None` for an empty group.
pub fn aggregate(
    lines: &[&TranscriptLine],
    text: String,
    text_with_speaker: String,
    chunk_index: u32,
    chunk_id: Uuid,
) -> Option<Chunk> {
    let first = lines.first()?;
    let last = lines.last()?;

    Some(Chunk {
        chunk_id,
        chunk_index,
        text,
        text_with_speaker,
        start_time: first.start_time_seconds,
        end_time: last.end_time_seconds,
        original_start_time: first.start_time_seconds,
        original_end_time: last.end_time_seconds,
        episode: first.episode.clone(),
        speaker: union_speakers(lines),
        metrics: EpisodeMetrics::first_non_null(lines.iter().map(|l| &l.metrics)),
    })
}

/// Distinct speakers of `lines` joined with [`SPEAKER_DELIMITER`].
///
/// This is a set: the order of names in the output is not part of the
/// contract and consumers must not depend on it. Blank labels are skipped.
pub fn union_speakers(lines: &[&TranscriptLine]) -> String {
    let mut speakers: Vec<&str> = Vec::new();
    for line in lines {
        let speaker = line.speaker.trim();
        if !speaker.is_empty() && !speakers.contains(&speaker) {
            speakers.push(speaker);
        }
    }
    speakers.join(SPEAKER_DELIMITER)
}

/// Cut `s` to at most `max_chars` characters, respecting char boundaries.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s.to_string(),
    }
}
