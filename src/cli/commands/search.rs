//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::retrieval::{DateRange, SearchEngine, SearchOptions};
use crate::vector_store::open_index;
use anyhow::Result;

/// Flags of the search command.
#[derive(Debug, Clone, Default)]
pub struct SearchArgs {
    pub limit: Option<usize>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub per_episode: Option<usize>,
    pub all_clips: bool,
    pub no_summary: bool,
    pub json: bool,
}

/// Run the search command.
pub async fn run_search(query: &str, args: SearchArgs, settings: Settings) -> Result<()> {
    preflight::check(Operation::Search, &settings)?;

    let date_range = DateRange::from_bounds(args.from.as_deref(), args.to.as_deref())?;

    let options = SearchOptions {
        limit: args.limit,
        date_range,
        per_episode_cap: args.per_episode,
        disable_cap: args.all_clips,
        summarize: args.no_summary.then_some(false),
        enhance_query: None,
    };

    let index = open_index(&settings)?;
    let engine = SearchEngine::with_openai(&settings, index)?;

    let spinner = Output::spinner("Searching...");
    let response = engine.search(query, &options).await;
    spinner.finish_and_clear();

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if response.results.is_empty() {
        match &date_range {
            Some(range) => Output::warning(&format!(
                "No results found for '{}' between {} and {}. Try widening the date range.",
                query, range.from, range.to
            )),
            None => Output::warning("No results found matching your query."),
        }
        return Ok(());
    }

    if let Some(enhanced) = &response.enhanced_query {
        Output::kv("Enhanced query", enhanced);
    }
    if let Some(guest) = &response.matched_guest {
        Output::info(&format!(
            "Query mentions {}; showing every distinct clip per episode.",
            guest
        ));
    }

    Output::success(&format!(
        "Showing {} of {} candidate clips",
        response.results.len(),
        response.candidates
    ));

    for (i, result) in response.results.iter().enumerate() {
        Output::search_result(i + 1, result);
    }

    Ok(())
}
