//! List command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::open_index;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    preflight::check(Operation::Browse, &settings)?;
    let index = open_index(&settings)?;

    match index.list_episodes().await {
        Ok(episodes) => {
            if episodes.is_empty() {
                Output::info("No episodes indexed yet. Use 'podsift ingest <file>' to add content.");
            } else {
                Output::header(&format!("Indexed Episodes ({})", episodes.len()));
                println!();

                for episode in &episodes {
                    Output::episode_info(
                        &episode.episode_name,
                        &episode.episode_id,
                        episode.guest_name.as_deref(),
                        episode.chunk_count,
                        episode.total_duration_seconds,
                    );
                }

                let total_chunks: u32 = episodes.iter().map(|e| e.chunk_count).sum();
                println!();
                Output::kv("Total episodes", &episodes.len().to_string());
                Output::kv("Total chunks", &total_chunks.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list episodes: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
