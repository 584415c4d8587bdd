//! CLI module for Podsift.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Podsift - Podcast transcript search
///
/// Chunks diarized podcast transcripts, indexes them for semantic search and
/// returns diverse, context-rich clips for a query.
#[derive(Parser, Debug)]
#[command(name = "podsift")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "PODSIFT_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk a transcript file without embedding or indexing
    Chunk {
        /// Transcript file (JSON array or JSON Lines)
        input: String,

        /// Write chunks to this file instead of stdout
        #[arg(short, long)]
        output: Option<String>,

        /// Minimum words per chunk (overrides config)
        #[arg(long)]
        min_words: Option<usize>,

        /// Maximum words per chunk (overrides config)
        #[arg(long)]
        max_words: Option<usize>,
    },

    /// Chunk, embed and index every episode in a transcript file
    Ingest {
        /// Transcript file (JSON array or JSON Lines)
        input: String,

        /// Re-index episodes that are already indexed
        #[arg(short, long)]
        force: bool,
    },

    /// Rebuild chunks from stored transcript lines
    Rechunk {
        /// Episode ID to rechunk (use 'all' to rechunk everything)
        episode_id: String,
    },

    /// Search for relevant podcast clips
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Prefer episodes released on or after this date (YYYY-MM-DD)
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// Prefer episodes released on or before this date (YYYY-MM-DD)
        #[arg(long, requires = "from")]
        to: Option<String>,

        /// Maximum clips per episode
        #[arg(long)]
        per_episode: Option<usize>,

        /// Show every matching clip without the per-episode limit
        #[arg(long)]
        all_clips: bool,

        /// Skip relevance summaries
        #[arg(long)]
        no_summary: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the indexed chunks of an episode
    Inspect {
        /// Episode ID
        episode_id: String,

        /// Only chunks starting at or after this second
        #[arg(long)]
        from_seconds: Option<f64>,

        /// Only chunks starting at or before this second
        #[arg(long)]
        to_seconds: Option<f64>,
    },

    /// List indexed episodes
    List,

    /// Start HTTP API server for integration with other systems
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search() {
        let cli = Cli::try_parse_from([
            "podsift", "search", "sleep", "--from", "2023-01-01", "--to", "2023-06-30", "-l", "5",
        ])
        .unwrap();

        match cli.command {
            Commands::Search {
                query, from, limit, ..
            } => {
                assert_eq!(query, "sleep");
                assert_eq!(from.as_deref(), Some("2023-01-01"));
                assert_eq!(limit, Some(5));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_date_bounds_come_in_pairs() {
        assert!(Cli::try_parse_from(["podsift", "search", "sleep", "--from", "2023-01-01"]).is_err());
    }

    #[test]
    fn test_verbosity_is_global() {
        let cli = Cli::try_parse_from(["podsift", "list", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
