//! Search command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::search::{SearchIndex, TantivyIndex};
use crate::searchterms::{extract_offset, QueryParser};
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, limit: Option<usize>, settings: Settings) -> Result<()> {
    let terms = match QueryParser::new().parse(query) {
        Ok(terms) => terms,
        Err(e) => {
            Output::error(&format!("Invalid query: {}", e));
            return Err(e.into());
        }
    };
    let (terms, offset) = extract_offset(terms);
    let offset = offset.unwrap_or(0);
    let limit = limit.unwrap_or(settings.index.default_limit).max(1);

    let index = TantivyIndex::open(&settings.index_path(), settings.index.writer_heap_bytes)?;

    let spinner = Output::spinner("Searching...");
    let results = index.search(&terms, offset, limit).await;
    spinner.finish_and_clear();

    match results {
        Ok(docs) => {
            if docs.is_empty() {
                Output::warning("No dialogue found matching your query.");
            } else {
                Output::success(&format!(
                    "Showing {} results from offset {}",
                    docs.len(),
                    offset
                ));
                for doc in &docs {
                    Output::search_result(doc);
                }
                if docs.len() == limit {
                    Output::info(&format!("More may follow: add offset:{}", offset + limit));
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
