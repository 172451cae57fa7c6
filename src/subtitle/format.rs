//! SubRip output formatting.

use super::SrtCue;
use std::time::Duration;

/// Render cues as a SubRip document.
pub fn format_srt(cues: &[SrtCue]) -> String {
    let mut output = String::new();

    for cue in cues {
        output.push_str(&format!("{}\n", cue.index));

        // Timestamps: 00:00:00,000 --> 00:00:00,000
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_timestamp(cue.start),
            format_srt_timestamp(cue.end)
        ));

        output.push_str(&cue.text);
        output.push_str("\n\n");
    }

    output
}

/// Format an offset for SRT (00:00:00,000).
pub fn format_srt_timestamp(offset: Duration) -> String {
    let total_ms = offset.as_millis() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, ms)
}
