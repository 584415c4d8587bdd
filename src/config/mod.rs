//! Configuration module for Podsift.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, QueryPrompts, SummaryPrompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, GenerationSettings, IngestSettings,
    PromptSettings, RetrievalSettings, Settings, VectorStoreSettings,
};
