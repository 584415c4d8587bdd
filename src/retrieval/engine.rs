//! End-to-end query pipeline.

use super::{
    apply_date_preference, select_diverse, ContextAssembler, ContextWindow, DateRange,
    SearchHit, SearchResult, SelectionConfig,
};
use crate::config::{Prompts, RetrievalSettings, Settings};
use crate::embedding::{Embedder, EmbeddingVariant, OpenAIEmbedder};
use crate::error::{PodsiftError, Result};
use crate::generation::{OpenAIGenerator, TextGenerator};
use crate::transcript::format_timestamp;
use crate::vector_store::{ChunkFilter, SimilarityIndex};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Summary used when a hit has no surrounding context.
pub const EMPTY_CONTEXT_SUMMARY: &str = "This clip provides context related to the query.";

/// Summary used when the generator fails.
pub const FALLBACK_SUMMARY: &str =
    "This clip is relevant to the query because it contains related discussion points.";

/// Per-query overrides of the configured retrieval settings.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Maximum results returned.
    pub limit: Option<usize>,
    /// Preferred release-date range.
    pub date_range: Option<DateRange>,
    pub per_episode_cap: Option<usize>,
    /// Skip the per-episode cap.
    pub disable_cap: bool,
    pub summarize: Option<bool>,
    pub enhance_query: Option<bool>,
}

/// Outcome of one query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    /// Query text that was embedded, when it differs from `query`.
    pub enhanced_query: Option<String>,
    /// Guest named in the query, which lifts the per-episode cap.
    pub matched_guest: Option<String>,
    /// Hits returned by the primary search.
    pub candidates: usize,
    pub results: Vec<SearchResult>,
}

/// Runs queries against the index.
pub struct SearchEngine {
    index: Arc<dyn SimilarityIndex>,
    embedder: Arc<dyn Embedder>,
    generator: Option<Arc<dyn TextGenerator>>,
    assembler: ContextAssembler,
    settings: RetrievalSettings,
}

impl SearchEngine {
    pub fn new(
        index: Arc<dyn SimilarityIndex>,
        embedder: Arc<dyn Embedder>,
        generator: Option<Arc<dyn TextGenerator>>,
        settings: RetrievalSettings,
    ) -> Self {
        let assembler = ContextAssembler::from_settings(index.clone(), &settings);
        Self {
            index,
            embedder,
            generator,
            assembler,
            settings,
        }
    }

    /// Engine over `index` using OpenAI for embeddings and generation.
    pub fn with_openai(settings: &Settings, index: Arc<dyn SimilarityIndex>) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let embedder = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding)?);
        let generator: Arc<dyn TextGenerator> =
            Arc::new(OpenAIGenerator::new(&settings.generation, prompts)?);

        Ok(Self::new(
            index,
            embedder,
            Some(generator),
            settings.retrieval.clone(),
        ))
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    #[instrument(skip(self, options), fields(query = %query))]
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PodsiftError::InvalidInput("Query must not be empty".to_string()));
        }

        let enhanced_query = if options.enhance_query.unwrap_or(self.settings.enhance_query) {
            self.enhance(query).await
        } else {
            None
        };
        let embedded = self
            .embedder
            .embed(enhanced_query.as_deref().unwrap_or(query))
            .await;
        let embedding = match embedded {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Query embedding failed, returning no results: {}", e);
                return Ok(SearchResponse {
                    query: query.to_string(),
                    enhanced_query,
                    matched_guest: None,
                    candidates: 0,
                    results: Vec::new(),
                });
            }
        };

        // Queries naming a guest are scored against the speaker-labelled vectors.
        let matched_guest = self.guest_in_query(query).await;
        let variant = if matched_guest.is_some() {
            EmbeddingVariant::Speaker
        } else {
            EmbeddingVariant::Text
        };

        let hits = self.primary_search(&embedding, variant).await;
        let candidates = hits.len();
        let limit = options.limit.unwrap_or(self.settings.max_results);

        let selection = SelectionConfig {
            per_episode_cap: options
                .per_episode_cap
                .unwrap_or(self.settings.per_episode_cap),
            near_duplicate_seconds: self.settings.near_duplicate_seconds,
            disable_cap: options.disable_cap || matched_guest.is_some(),
        };

        let hits = apply_date_preference(
            hits,
            options.date_range.as_ref(),
            self.settings.top_k,
            limit,
        );
        let mut selected = select_diverse(hits, &selection);
        selected.truncate(limit);

        let windows: Vec<(SearchHit, ContextWindow)> = stream::iter(selected)
            .map(|hit| {
                let embedding = &embedding;
                async move {
                    let window = self.assembler.assemble(&hit, embedding, variant).await;
                    (hit, window)
                }
            })
            .buffered(self.settings.max_concurrent_lookups.max(1))
            .collect()
            .await;

        let summarize = options.summarize.unwrap_or(self.settings.summarize);
        let results: Vec<SearchResult> = stream::iter(windows)
            .map(|(hit, context)| async move {
                let summary = if summarize {
                    Some(self.summarize(&context, query).await)
                } else {
                    None
                };
                SearchResult {
                    url: hit.chunk.watch_url(),
                    timestamp: format_timestamp(hit.start_time()),
                    hit,
                    context,
                    summary,
                }
            })
            .buffered(self.settings.max_concurrent_summaries.max(1))
            .collect()
            .await;

        info!(
            "Query returned {} results from {} candidates",
            results.len(),
            candidates
        );

        Ok(SearchResponse {
            query: query.to_string(),
            enhanced_query,
            matched_guest,
            candidates,
            results,
        })
    }

    /// Rewritten query, or `None` to use the query as typed.
    async fn enhance(&self, query: &str) -> Option<String> {
        let generator = self.generator.as_ref()?;
        match generator.enhance_query(query).await {
            Ok(enhanced) if enhanced != query => Some(enhanced),
            Ok(_) => None,
            Err(e) => {
                warn!("Query enhancement failed, using the raw query: {}", e);
                None
            }
        }
    }

    /// Ranked hits past the intro, over-fetched for later filtering.
    async fn primary_search(&self, embedding: &[f32], variant: EmbeddingVariant) -> Vec<SearchHit> {
        let top_k = self.settings.top_k * 2;
        let filter =
            ChunkFilter::starting_from(self.settings.min_start_seconds).scored_by(variant);

        let scored = match self.index.query(embedding, &filter, top_k).await {
            Ok(scored) => scored,
            Err(e) => {
                warn!("Primary search failed, retrying without filters: {}", e);
                let unfiltered = ChunkFilter::any().scored_by(variant);
                match self.index.query(embedding, &unfiltered, top_k).await {
                    Ok(scored) => scored,
                    Err(e) => {
                        warn!("Unfiltered search failed: {}", e);
                        Vec::new()
                    }
                }
            }
        };

        scored.into_iter().map(SearchHit::from).collect()
    }

    /// Guest of an indexed episode whose name appears in the query.
    async fn guest_in_query(&self, query: &str) -> Option<String> {
        let episodes = match self.index.list_episodes().await {
            Ok(episodes) => episodes,
            Err(e) => {
                warn!("Could not list episodes for guest matching: {}", e);
                return None;
            }
        };

        let guests = episodes.iter().filter_map(|e| e.guest_name.as_deref());
        let matched = find_guest_mention(query, guests);
        if let Some(guest) = &matched {
            debug!(
                "Query mentions guest {}; scoring speaker-labelled embeddings",
                guest
            );
        }
        matched
    }

    async fn summarize(&self, context: &ContextWindow, query: &str) -> String {
        let passages = context.passages();
        if passages.iter().all(|p| p.trim().is_empty()) {
            return EMPTY_CONTEXT_SUMMARY.to_string();
        }

        let Some(generator) = &self.generator else {
            return FALLBACK_SUMMARY.to_string();
        };

        match generator.explain_relevance(&passages, query).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Summary generation failed: {}", e);
                FALLBACK_SUMMARY.to_string()
            }
        }
    }
}

/// First guest name contained in `query`, compared case-insensitively.
///
/// Guest fields listing several people (`"A & B"`, `"A, B"`, `"A / B"`) are
/// matched name by name.
pub fn find_guest_mention<'a>(
    query: &str,
    guests: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    let query = query.to_lowercase();
    guests
        .into_iter()
        .flat_map(|g| g.split(&['&', ',', '/'][..]))
        .map(str::trim)
        .filter(|name| name.contains(' '))
        .find(|name| query.contains(&name.to_lowercase()))
        .map(str::to_string)
}
