//! Manifest command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::store::{ManifestStore, SqliteStore};
use anyhow::Result;

/// List recorded sources and the imported episodes.
pub async fn run_manifest(settings: Settings) -> Result<()> {
    let store = SqliteStore::new(&settings.sqlite_path())?;

    let manifest = store.get_manifest().await?;
    let mut sources: Vec<_> = manifest.into_iter().collect();
    sources.sort();

    if sources.is_empty() {
        Output::warning("Nothing imported yet. Run: earshot import");
        return Ok(());
    }

    Output::header(&format!("Sources ({})", sources.len()));
    for (path, mod_time) in &sources {
        Output::list_item(&format!(
            "{} ({})",
            path.display(),
            mod_time.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }

    let media = store.list_media()?;
    Output::header(&format!("Episodes ({})", media.len()));
    for (media_id, lines) in &media {
        Output::kv(media_id, &format!("{} lines", lines));
    }
    println!();
    Output::info(&format!("{} dialogue lines in total", store.dialog_count()?));

    Ok(())
}
