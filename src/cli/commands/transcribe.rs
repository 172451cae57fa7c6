//! Transcribe command implementation.

use crate::audiometa::sibling_path;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::dialogue::{DialogueBuilder, MediaInfo, MediaNameParser};
use crate::subtitle::{format_srt, SrtCue};
use crate::transcription::{AssemblyAiTranscriber, CachingTranscriber, Transcriber};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Transcribe one media file and write the result as SubRip.
///
/// The transcript goes through the same cache as imports, so transcribing a
/// file and then importing it costs one job.
pub async fn run_transcribe(media: &str, output: Option<String>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Transcribe, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'earshot doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let media_path = Settings::expand_path(media);
    if !media_path.is_file() {
        Output::error(&format!("File not found: {}", media_path.display()));
        return Err(anyhow::anyhow!("file not found: {}", media_path.display()));
    }
    let out_path = output
        .map(|o| Settings::expand_path(&o))
        .unwrap_or_else(|| sibling_path(&media_path, ".srt"));

    let client = AssemblyAiTranscriber::from_settings(&settings.transcription)?;
    let transcriber = CachingTranscriber::new(Arc::new(client));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    Output::info(&format!("Transcribing: {}", media_path.display()));
    let spinner = Output::spinner("Waiting for transcript...");
    let transcript = transcriber.transcribe(&media_path, &cancel).await;
    spinner.finish_and_clear();
    let transcript = transcript?;

    let item = DialogueBuilder::new()
        .from_transcript(&transcript, media_info(&media_path))
        .map_err(|reason| anyhow::anyhow!("Cannot build dialogue: {}", reason))?;
    // SubRip numbers cues from 1
    let cues: Vec<SrtCue> = item
        .dialogue
        .iter()
        .map(|line| SrtCue {
            index: line.pos + 1,
            ..SrtCue::from(line)
        })
        .collect();
    tokio::fs::write(&out_path, format_srt(&cues)).await?;

    Output::success(&format!(
        "Wrote {} cues to {}",
        cues.len(),
        out_path.display()
    ));
    Ok(())
}

/// Episode info for `path`, or a placeholder when the name does not follow
/// the episode naming scheme. Only the file name ends up in the output.
fn media_info(path: &Path) -> MediaInfo {
    MediaNameParser::new().parse(path).unwrap_or_else(|| {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        MediaInfo::new("", 0, 0, &file_name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_info_fallback() {
        let info = media_info(Path::new("/tmp/holiday recording.mp3"));
        assert_eq!(info.media_file_name, "holiday recording.mp3");

        let info = media_info(Path::new("/media/xfm-S02E03.mp3"));
        assert_eq!(info.publication, "xfm");
        assert_eq!((info.series, info.episode), (2, 3));
    }
}
