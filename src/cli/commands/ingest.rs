//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(input: &str, force: bool, settings: Settings) -> Result<()> {
    preflight::check(Operation::Ingest, &settings)?;

    let path = Settings::expand_path(input);
    if !path.exists() {
        Output::error(&format!("Transcript file not found: {}", path.display()));
        anyhow::bail!("Transcript file not found: {}", path.display());
    }

    let orchestrator = Orchestrator::new(settings)?;

    Output::info(&format!("Ingesting {}", path.display()));
    let spinner = Output::spinner("Chunking, embedding and indexing...");
    let result = orchestrator.ingest_file(&path, force).await;
    spinner.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            Output::error(&format!("Ingestion failed: {}", e));
            return Err(e.into());
        }
    };

    for episode in &report.episodes {
        Output::episode_report(episode);
    }

    println!();
    Output::kv("Indexed", &report.indexed().to_string());
    Output::kv("Skipped", &report.skipped().to_string());
    Output::kv("Failed", &report.failed().to_string());
    Output::kv("Chunks", &report.chunks_indexed().to_string());

    if report.skipped() > 0 {
        Output::info("Use --force to re-index episodes that are already indexed.");
    }
    if report.failed() > 0 {
        Output::warning(&format!("{} episodes failed to ingest", report.failed()));
    } else {
        Output::success("Ingestion complete");
    }

    Ok(())
}
