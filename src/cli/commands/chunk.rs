//! Chunk command implementation.

use crate::chunking::{ChunkBuilder, ChunkingConfig, PunctuationSplitter};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::transcript::load_lines;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Run the chunk command.
pub fn run_chunk(
    input: &str,
    output: Option<&str>,
    min_words: Option<usize>,
    max_words: Option<usize>,
    settings: Settings,
) -> Result<()> {
    preflight::check(Operation::Chunk, &settings)?;

    let mut config = ChunkingConfig::from(&settings.chunking);
    if let Some(min) = min_words {
        config.min_words = min;
    }
    if let Some(max) = max_words {
        config.max_words = max;
    }

    let builder = ChunkBuilder::new(config, Arc::new(PunctuationSplitter::new()))?;
    let lines = load_lines(&Settings::expand_path(input))?;
    let chunks = builder.build_episodes(lines);
    let episodes = chunks
        .iter()
        .map(|c| c.episode_id())
        .collect::<HashSet<_>>()
        .len();

    let json = serde_json::to_string_pretty(&chunks)?;

    match output {
        Some(path) => {
            let path = Settings::expand_path(path);
            write_output(&path, &json)?;
            Output::success(&format!(
                "Wrote {} chunks from {} episodes to {}",
                chunks.len(),
                episodes,
                path.display()
            ));
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn write_output(path: &Path, json: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
