//! Text generation for relevance explanations and query enhancement.

mod openai;

pub use openai::OpenAIGenerator;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for text generation backends.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short explanation of why `passages` answer `query`.
    async fn explain_relevance(&self, passages: &[String], query: &str) -> Result<String>;

    /// Rewrite `query` with related terms before it is embedded.
    async fn enhance_query(&self, query: &str) -> Result<String>;
}
