//! Inspect command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::{open_index, ChunkFilter};
use anyhow::Result;
use console::style;

const MAX_CHUNKS: usize = 10_000;

/// Run the inspect command.
pub async fn run_inspect(
    episode_id: &str,
    from_seconds: Option<f64>,
    to_seconds: Option<f64>,
    settings: Settings,
) -> Result<()> {
    preflight::check(Operation::Browse, &settings)?;
    let index = open_index(&settings)?;

    let filter = ChunkFilter::episode(episode_id).between(from_seconds, to_seconds);
    let chunks = index.fetch(&filter, MAX_CHUNKS).await?;

    let Some(first) = chunks.first() else {
        Output::warning(&format!("No chunks found for episode: {}", episode_id));
        Output::info("Use 'podsift list' to see indexed episodes.");
        return Ok(());
    };

    Output::header(&first.episode.episode_name);
    Output::kv("Episode", episode_id);
    if let Some(guest) = &first.episode.guest_name {
        Output::kv("Guest", guest);
    }
    if let Some(date) = &first.episode.release_date {
        Output::kv("Released", date);
    }
    Output::kv("Chunks", &chunks.len().to_string());
    println!();

    for chunk in &chunks {
        println!(
            "{} {} {} ({} words)",
            style(format!("#{}", chunk.chunk_index)).dim(),
            style(chunk.format_timestamp()).cyan(),
            style(&chunk.speaker).bold(),
            chunk.word_count()
        );
        println!("   {}", chunk.text);
        println!();
    }

    Ok(())
}
