//! Diarized transcript lines as supplied by the upstream transcription step.

mod models;
mod source;

pub use models::{
    format_timestamp, group_by_episode, word_count, EpisodeInfo, EpisodeLines, EpisodeMetrics,
    TranscriptLine,
};
pub use source::{load_lines, parse_lines};
