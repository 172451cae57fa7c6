//! Dialog command implementation.

use super::Stores;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Print lines `start..=end` of one episode, optionally with the
/// neighbouring lines.
pub async fn run_dialog(media_id: &str, start: i32, end: i32, context: bool, settings: Settings) -> Result<()> {
    if start > end {
        Output::error(&format!("Start position {} is after end position {}", start, end));
        return Err(anyhow::anyhow!("invalid range {}..{}", start, end));
    }

    let stores = Stores::open(&settings)?;
    let indexer = stores.indexer();

    let lines = indexer.get_dialog_range(media_id, start, end).await?;
    if lines.is_empty() {
        Output::warning(&format!("No dialogue for {} in {}..={}", media_id, start, end));
        return Ok(());
    }

    Output::header(media_id);
    if context {
        let around = indexer.get_dialog_context(media_id, start, end).await?;
        for line in &around.before {
            Output::dialogue_line(line, true);
        }
        for line in &lines {
            Output::dialogue_line(line, false);
        }
        for line in &around.after {
            Output::dialogue_line(line, true);
        }
    } else {
        for line in &lines {
            Output::dialogue_line(line, false);
        }
    }

    Ok(())
}
