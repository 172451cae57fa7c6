//! Meta command implementation.

use crate::audiometa;
use crate::cli::preflight::{self, Operation};
use crate::cli::{MetaAction, Output};
use crate::config::Settings;
use anyhow::Result;

/// Run the meta command.
pub async fn run_meta(action: &MetaAction, settings: &Settings) -> Result<()> {
    match action {
        MetaAction::Dump { media } => {
            if let Err(e) = preflight::check(Operation::Meta, settings) {
                Output::error(&format!("{}", e));
                Output::info("Run 'earshot doctor' for detailed diagnostics.");
                return Err(e.into());
            }

            let media_path = Settings::expand_path(media);
            let dump = audiometa::dump_meta(&media_path).await?;

            Output::header(&media_path.display().to_string());
            if let Some(duration) = dump.probe.duration() {
                Output::kv("Duration", &format!("{:.1}s", duration.as_secs_f64()));
            }
            for (key, value) in &dump.probe.format.tags {
                Output::kv(key, value);
            }
            println!();

            match &dump.image_path {
                Some(image) => Output::success(&format!("Cover written to {}", image.display())),
                None => Output::info("No embedded cover image"),
            }
            Output::success(&format!("Tags written to {}", dump.meta_path.display()));
        }
    }

    Ok(())
}
