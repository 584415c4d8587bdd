//! Podsift CLI entry point.

use anyhow::Result;
use clap::Parser;
use podsift::cli::commands::{self, SearchArgs};
use podsift::cli::{Cli, Commands};
use podsift::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("podsift={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    std::fs::create_dir_all(settings.data_dir())?;

    match cli.command {
        Commands::Chunk {
            input,
            output,
            min_words,
            max_words,
        } => {
            commands::run_chunk(&input, output.as_deref(), min_words, max_words, settings)?;
        }

        Commands::Ingest { input, force } => {
            commands::run_ingest(&input, force, settings).await?;
        }

        Commands::Rechunk { episode_id } => {
            commands::run_rechunk(&episode_id, settings).await?;
        }

        Commands::Search {
            query,
            limit,
            from,
            to,
            per_episode,
            all_clips,
            no_summary,
            json,
        } => {
            let args = SearchArgs {
                limit,
                from,
                to,
                per_episode,
                all_clips,
                no_summary,
                json,
            };
            commands::run_search(&query, args, settings).await?;
        }

        Commands::Inspect {
            episode_id,
            from_seconds,
            to_seconds,
        } => {
            commands::run_inspect(&episode_id, from_seconds, to_seconds, settings).await?;
        }

        Commands::List => {
            commands::run_list(settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(&host, port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, settings, config_path)?;
        }
    }

    Ok(())
}
