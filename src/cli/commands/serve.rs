//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for clip search and episode browsing.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::PodsiftError;
use crate::retrieval::{DateRange, SearchEngine, SearchOptions};
use crate::vector_store::{open_index, ChunkFilter, IndexedEpisode, SimilarityIndex};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Upper bound on chunks returned for one episode.
const MAX_EPISODE_CHUNKS: usize = 10_000;

/// Shared application state.
struct AppState {
    engine: SearchEngine,
    index: Arc<dyn SimilarityIndex>,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let index = open_index(&settings)?;
    let engine = SearchEngine::with_openai(&settings, index.clone())?;

    let state = Arc::new(AppState { engine, index });
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API server listening on {}", addr);

    Output::header("Podsift API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Search", "POST /search");
    Output::kv("List Episodes", "GET  /episodes");
    Output::kv("Get Episode", "GET  /episodes/:episode_id");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/search", post(search))
        .route("/episodes", get(list_episodes))
        .route("/episodes/{episode_id}", get(get_episode))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
    /// Preferred release dates, `YYYY-MM-DD`.
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    per_episode: Option<usize>,
    #[serde(default)]
    all_clips: bool,
    #[serde(default)]
    summarize: Option<bool>,
}

#[derive(Serialize)]
struct EpisodeListResponse {
    episodes: Vec<IndexedEpisode>,
    total: usize,
}

#[derive(Deserialize)]
struct EpisodeQuery {
    from_seconds: Option<f64>,
    to_seconds: Option<f64>,
}

#[derive(Serialize)]
struct EpisodeDetailResponse {
    episode_id: String,
    episode_name: String,
    chunk_count: usize,
    chunks: Vec<ChunkInfo>,
}

#[derive(Serialize)]
struct ChunkInfo {
    chunk_index: u32,
    speaker: String,
    text: String,
    start_time: f64,
    end_time: f64,
    timestamp: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

impl SearchRequest {
    fn options(&self) -> Result<SearchOptions, PodsiftError> {
        let date_range = DateRange::from_bounds(self.from.as_deref(), self.to.as_deref())?;

        Ok(SearchOptions {
            limit: self.limit,
            date_range,
            per_episode_cap: self.per_episode,
            disable_cap: self.all_clips,
            summarize: self.summarize,
            enhance_query: None,
        })
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn search(State(state): State<Arc<AppState>>, Json(req): Json<SearchRequest>) -> Response {
    let options = match req.options() {
        Ok(options) => options,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    match state.engine.search(&req.query, &options).await {
        Ok(response) => Json(response).into_response(),
        Err(e @ PodsiftError::InvalidInput(_)) => error_response(StatusCode::BAD_REQUEST, e),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

async fn list_episodes(State(state): State<Arc<AppState>>) -> Response {
    match state.index.list_episodes().await {
        Ok(episodes) => Json(EpisodeListResponse {
            total: episodes.len(),
            episodes,
        })
        .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

async fn get_episode(
    State(state): State<Arc<AppState>>,
    Path(episode_id): Path<String>,
    Query(range): Query<EpisodeQuery>,
) -> Response {
    let filter =
        ChunkFilter::episode(episode_id.clone()).between(range.from_seconds, range.to_seconds);

    match state.index.fetch(&filter, MAX_EPISODE_CHUNKS).await {
        Ok(chunks) if chunks.is_empty() => error_response(
            StatusCode::NOT_FOUND,
            format!("Episode not found: {}", episode_id),
        ),
        Ok(chunks) => {
            let episode_name = chunks
                .first()
                .map(|c| c.episode.episode_name.clone())
                .unwrap_or_default();

            Json(EpisodeDetailResponse {
                episode_id,
                episode_name,
                chunk_count: chunks.len(),
                chunks: chunks
                    .into_iter()
                    .map(|c| ChunkInfo {
                        timestamp: c.format_timestamp(),
                        chunk_index: c.chunk_index,
                        speaker: c.speaker,
                        text: c.text,
                        start_time: c.start_time,
                        end_time: c.end_time,
                    })
                    .collect(),
            })
            .into_response()
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}
