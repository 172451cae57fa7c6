//! Import command implementation.

use super::Stores;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::importer::{Importer, SweepReport};
use crate::transcription::{AssemblyAiTranscriber, CachingTranscriber};
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Run the import command.
pub async fn run_import(watch: bool, media_dir: Option<String>, mut settings: Settings) -> Result<()> {
    if media_dir.is_some() {
        settings.import.media_dir = media_dir;
    }

    if let Err(e) = preflight::check(Operation::Import, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'earshot doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let media_dir = settings.media_dir()?;
    let stores = Stores::open(&settings)?;

    let mut importer = Importer::new(
        media_dir.clone(),
        settings.import.clone(),
        stores.sqlite.clone(),
        stores.indexer(),
    );
    if settings.import.transcribe_missing {
        let client = AssemblyAiTranscriber::from_settings(&settings.transcription)?;
        importer = importer.with_transcriber(Arc::new(CachingTranscriber::new(Arc::new(client))));
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received");
            on_signal.cancel();
        }
    });

    if watch {
        Output::info(&format!(
            "Watching {} every {}s (Ctrl-C to stop)",
            media_dir.display(),
            settings.import.poll_interval_seconds
        ));
        importer.run(cancel).await?;
        Output::success("Stopped.");
        return Ok(());
    }

    Output::info(&format!("Scanning {}", media_dir.display()));
    let spinner = Output::spinner("Importing...");
    let report = importer.sweep(&cancel).await;
    spinner.finish_and_clear();

    print_report(&report?);
    Ok(())
}

fn print_report(report: &SweepReport) {
    Output::header("Import");
    Output::kv("Sources", &report.scanned.to_string());
    Output::kv("Unchanged", &report.skipped.to_string());
    Output::kv("Imported", &report.imported.to_string());
    Output::kv("Failed", &report.failed.len().to_string());

    for (path, reason) in &report.failed {
        Output::list_item(&format!("{}: {}", path.display(), reason));
    }
    println!();

    if report.cancelled {
        Output::warning("Import interrupted; remaining files will be picked up next run.");
    } else if report.failed.is_empty() {
        Output::success("Media directory is up to date.");
    } else {
        Output::warning("Some files failed and will be retried next run.");
    }
}
