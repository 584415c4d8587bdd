//! Rechunk command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the rechunk command.
pub async fn run_rechunk(episode_id: &str, settings: Settings) -> Result<()> {
    preflight::check(Operation::Ingest, &settings)?;
    let orchestrator = Orchestrator::new(settings)?;

    if episode_id == "all" {
        let episodes = orchestrator.list_rechunkable().await?;

        if episodes.is_empty() {
            Output::warning("No episodes with stored transcript lines found.");
            Output::info("Use 'podsift ingest <file> --force' to ingest and store them.");
            return Ok(());
        }

        Output::info(&format!("Found {} episodes to rechunk", episodes.len()));
        println!();

        let pb = Output::progress_bar(episodes.len() as u64, "Rechunking");
        let mut success_count = 0;
        let mut error_count = 0;

        for id in &episodes {
            pb.set_message(id.clone());
            match orchestrator.rechunk_episode(id).await {
                Ok(report) => {
                    pb.suspend(|| Output::episode_report(&report));
                    success_count += 1;
                }
                Err(e) => {
                    pb.suspend(|| Output::error(&format!("  {}: {}", id, e)));
                    error_count += 1;
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        println!();
        Output::info(&format!(
            "Rechunking complete: {} succeeded, {} failed",
            success_count, error_count
        ));
    } else {
        Output::info(&format!("Rechunking episode: {}", episode_id));

        let spinner = Output::spinner("Rechunking...");
        let result = orchestrator.rechunk_episode(episode_id).await;
        spinner.finish_and_clear();

        match result {
            Ok(report) => {
                Output::success("Rechunked:");
                Output::episode_report(&report);
            }
            Err(e) => {
                Output::error(&format!("Failed to rechunk: {}", e));
                return Err(e.into());
            }
        }
    }

    Ok(())
}
