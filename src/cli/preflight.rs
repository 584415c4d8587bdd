//! Pre-flight checks before expensive operations.
//!
//! Validates that credentials and the index are available before starting
//! operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{PodsiftError, Result};
use crate::openai::is_api_key_configured;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Offline chunking has no requirements.
    Chunk,
    /// Ingestion and rechunking embed text, so they need an API key.
    Ingest,
    /// Search needs an API key and an existing index.
    Search,
    /// Listing and inspecting need an existing index.
    Browse,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Chunk => {}
        Operation::Ingest => {
            check_api_key()?;
        }
        Operation::Search => {
            check_api_key()?;
            check_index(settings)?;
        }
        Operation::Browse => {
            check_index(settings)?;
        }
    }
    Ok(())
}

fn check_api_key() -> Result<()> {
    if is_api_key_configured() {
        Ok(())
    } else {
        Err(PodsiftError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        ))
    }
}

/// A persistent index must exist before it can be queried.
fn check_index(settings: &Settings) -> Result<()> {
    if settings.vector_store.provider != "sqlite" {
        return Ok(());
    }
    let path = settings.sqlite_path();
    if path.exists() {
        Ok(())
    } else {
        Err(PodsiftError::Config(format!(
            "No index found at {}. Run 'podsift ingest <file>' first.",
            path.display()
        )))
    }
}
