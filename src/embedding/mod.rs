//! Embedding generation for chunk indexing and query search.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::chunking::Chunk;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Which form of a chunk's text an embedding was computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingVariant {
    /// Speaker-free text.
    #[default]
    Text,
    /// `Speaker: text` form, searched when a query names a person.
    Speaker,
}

/// The chunk text embedded for `variant`.
pub fn embedding_text(chunk: &Chunk, variant: EmbeddingVariant) -> &str {
    match variant {
        EmbeddingVariant::Text => &chunk.text,
        EmbeddingVariant::Speaker => &chunk.text_with_speaker,
    }
}
