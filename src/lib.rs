//! Podsift - Podcast transcript chunking and retrieval
//!
//! Turns diarized podcast transcripts into a searchable index of clips and
//! answers queries with diverse, context-rich results.
//!
//! # Overview
//!
//! Podsift allows you to:
//! - Pack timestamped transcript lines into word-bounded chunks
//! - Embed and index chunks with their episode metadata
//! - Search semantically, with soft release-date preferences
//! - Get each hit back with its surrounding conversation and a short summary
//!
//! # Architecture
//!
//! - `transcript` - Transcript line model and loading
//! - `chunking` - Chunk building and metadata aggregation
//! - `embedding` - Embedding generation
//! - `vector_store` - Similarity index abstraction
//! - `generation` - Query enhancement and relevance summaries
//! - `retrieval` - Diversity selection, date preference and context assembly
//! - `orchestrator` - Ingestion pipeline
//!
//! # Example
//!
//! ```rust,no_run
//! use podsift::config::Settings;
//! use podsift::retrieval::{SearchEngine, SearchOptions};
//! use podsift::vector_store::open_index;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let index = open_index(&settings)?;
//!     let engine = SearchEngine::with_openai(&settings, index)?;
//!
//!     let response = engine.search("sleep and memory", &SearchOptions::default()).await?;
//!     for result in &response.results {
//!         println!("{} {}", result.timestamp, result.url);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod openai;
pub mod orchestrator;
pub mod retrieval;
pub mod transcript;
pub mod vector_store;

pub use error::{PodsiftError, Result};
