//! Query-time retrieval: ranked hits, diversity selection and context windows.
//!
//! A query runs one primary similarity search, applies the date preference
//! and diversity selection to the ranked hits, then expands every surviving
//! hit into the conversation window that follows it.

pub mod context;
pub mod dates;
mod engine;
pub mod selector;

pub use context::{ContextAssembler, ContextFragment, ContextWindow};
pub use dates::{apply_date_preference, parse_release_date, DateRange};
pub use engine::{
    find_guest_mention, SearchEngine, SearchOptions, SearchResponse, EMPTY_CONTEXT_SUMMARY,
    FALLBACK_SUMMARY,
};
pub use selector::{select_diverse, SelectionConfig};

use crate::chunking::Chunk;
use crate::vector_store::ScoredChunk;
use serde::Serialize;

/// One ranked hit of a query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Similarity score (higher is better).
    pub score: f32,
    pub chunk: Chunk,
    /// Whether the episode's release date falls in the requested range.
    pub in_date_range: bool,
}

impl SearchHit {
    pub fn episode_id(&self) -> &str {
        self.chunk.episode_id()
    }

    pub fn start_time(&self) -> f64 {
        self.chunk.start_time
    }
}

impl From<ScoredChunk> for SearchHit {
    fn from(scored: ScoredChunk) -> Self {
        Self {
            score: scored.score,
            chunk: scored.chunk,
            in_date_range: true,
        }
    }
}

/// A selected hit with its surrounding conversation, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub hit: SearchHit,
    pub context: ContextWindow,
    /// Relevance explanation; absent when summaries are disabled.
    pub summary: Option<String>,
    /// Watch link starting at the hit.
    pub url: String,
    /// Formatted start time (e.g., "02:34").
    pub timestamp: String,
}
