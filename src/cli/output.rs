//! CLI output formatting utilities.

use crate::orchestrator::{EpisodeReport, EpisodeStatus};
use crate::retrieval::SearchResult;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print episode info.
    pub fn episode_info(name: &str, id: &str, guest: Option<&str>, chunks: u32, duration: f64) {
        let guest_part = guest
            .map(|g| format!(" with {}", g))
            .unwrap_or_default();
        println!(
            "  {} {}{} ({}, {} chunks, {})",
            style("*").cyan(),
            style(name).bold(),
            guest_part,
            style(id).dim(),
            chunks,
            format_duration(duration)
        );
    }

    /// Print the outcome of ingesting one episode.
    pub fn episode_report(report: &EpisodeReport) {
        let label = if report.episode_name.is_empty() {
            report.episode_id.as_str()
        } else {
            report.episode_name.as_str()
        };
        match &report.status {
            EpisodeStatus::Indexed { chunks } => {
                println!("  {} {} ({} chunks)", style("+").green(), label, chunks)
            }
            EpisodeStatus::Skipped => {
                println!("  {} {} (already indexed)", style("-").dim(), label)
            }
            EpisodeStatus::Failed { error } => {
                eprintln!("  {} {}: {}", style("!").red(), label, error)
            }
        }
    }

    /// Print one clip of a search.
    pub fn search_result(rank: usize, result: &SearchResult) {
        let chunk = &result.hit.chunk;
        let date_note = if result.hit.in_date_range {
            String::new()
        } else {
            format!(" {}", style("(outside date range)").yellow())
        };

        println!(
            "\n{} {} @ {} (score: {:.2}){}",
            style(format!("{}.", rank)).green(),
            style(&chunk.episode.episode_name).bold(),
            style(&result.timestamp).cyan(),
            result.hit.score,
            date_note
        );

        if let Some(guest) = &chunk.episode.guest_name {
            println!("   {} {}", style("Guest:").dim(), guest);
        }
        if let Some(date) = &chunk.episode.release_date {
            println!("   {} {}", style("Released:").dim(), date);
        }
        if let Some(views) = chunk.metrics.views {
            println!("   {} {}", style("Views:").dim(), views);
        }
        if let Some(summary) = &result.summary {
            println!("   {}", summary);
        }

        let excerpt = if result.context.is_empty() {
            chunk.text_with_speaker.clone()
        } else {
            result
                .context
                .fragments
                .iter()
                .map(|f| f.text_with_speaker.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        };
        println!("   {}", style(content_preview(&excerpt, 300)).dim());
        println!("   {}", style(&result.url).dim());
    }

    /// Create a progress bar.
    pub fn progress_bar(len: u64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(msg.to_string());
        pb
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Format duration in seconds to a human-readable string.
fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Truncate content with ellipsis, on a char boundary.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42.0), "42s");
        assert_eq!(format_duration(125.0), "2m 5s");
        assert_eq!(format_duration(3725.0), "1h 2m 5s");
    }

    #[test]
    fn test_content_preview() {
        assert_eq!(content_preview("a\nb", 10), "a b");
        assert_eq!(content_preview("héllo world", 5), "héllo...");
    }
}
