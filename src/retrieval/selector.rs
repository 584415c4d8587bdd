//! Diversity selection over ranked hits.

use super::SearchHit;
use crate::config::RetrievalSettings;
use std::collections::HashMap;
use tracing::debug;

/// Limits applied while selecting hits.
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    /// Maximum accepted hits per episode.
    pub per_episode_cap: usize,
    /// Hits of one episode this close in start time are near-duplicates.
    pub near_duplicate_seconds: f64,
    /// Ignore the per-episode cap (near-duplicates are still dropped).
    pub disable_cap: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            per_episode_cap: 2,
            near_duplicate_seconds: 120.0,
            disable_cap: false,
        }
    }
}

impl From<&RetrievalSettings> for SelectionConfig {
    fn from(settings: &RetrievalSettings) -> Self {
        Self {
            per_episode_cap: settings.per_episode_cap,
            near_duplicate_seconds: settings.near_duplicate_seconds,
            disable_cap: false,
        }
    }
}

/// Keep hits in rank order, dropping near-duplicates and over-cap episodes.
///
/// A hit is a near-duplicate when its start time is within
/// `near_duplicate_seconds` (inclusive) of an already accepted hit of the
/// same episode. Rank order is never changed.
pub fn select_diverse(hits: Vec<SearchHit>, config: &SelectionConfig) -> Vec<SearchHit> {
    let mut accepted_times: HashMap<String, Vec<f64>> = HashMap::new();
    let mut selected = Vec::new();
    let total = hits.len();

    for hit in hits {
        let times = accepted_times
            .entry(hit.episode_id().to_string())
            .or_default();

        let start = hit.start_time();
        if times
            .iter()
            .any(|t| (start - t).abs() <= config.near_duplicate_seconds)
        {
            continue;
        }
        if !config.disable_cap && times.len() >= config.per_episode_cap {
            continue;
        }

        times.push(start);
        selected.push(hit);
    }

    debug!("Selected {} of {} hits", selected.len(), total);
    selected
}
