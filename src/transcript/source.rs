//! Loading transcript lines from exported files.
//!
//! Accepts either a JSON array of line records or JSON Lines (one record per
//! line), which is what the upstream table exports produce.

use super::TranscriptLine;
use crate::error::{PodsiftError, Result};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Load all transcript lines from a file.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_lines(path: &Path) -> Result<Vec<TranscriptLine>> {
    if !path.exists() {
        return Err(PodsiftError::TranscriptSource(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let lines = parse_lines(&content)?;
    info!("Loaded {} transcript lines from {}", lines.len(), path.display());
    Ok(lines)
}

/// Parse transcript lines from a JSON array or JSON Lines document.
pub fn parse_lines(content: &str) -> Result<Vec<TranscriptLine>> {
    let trimmed = content.trim_start();

    let lines: Vec<TranscriptLine> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)?
    } else {
        let mut parsed = Vec::new();
        for (number, raw) in content.lines().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            let line: TranscriptLine = serde_json::from_str(raw).map_err(|e| {
                PodsiftError::TranscriptSource(format!("Line {}: {}", number + 1, e))
            })?;
            parsed.push(line);
        }
        parsed
    };

    let untexted = lines.iter().filter(|l| l.line_text.trim().is_empty()).count();
    if untexted > 0 {
        warn!("{} transcript lines have no text", untexted);
    }
    let undated = lines
        .iter()
        .filter(|l| l.episode.release_date.is_none())
        .count();
    if undated > 0 {
        debug!("{} transcript lines have no release date", undated);
    }

    Ok(lines)
}
