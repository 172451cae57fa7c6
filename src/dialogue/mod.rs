//! Dialogue lines and the media items that own them.
//!
//! A media item is one episode. Its identity is the media ID
//! (`<publication>-S<nn>E<nn>`) and every line in it is addressed by
//! `(media_id, pos)`.

mod builder;
mod naming;

pub use builder::DialogueBuilder;
pub use naming::MediaNameParser;

use crate::subtitle::SrtCue;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Render series and episode numbers as `S01E02`.
pub fn format_series_episode(series: i32, episode: i32) -> String {
    format!("S{:02}E{:02}", series, episode)
}

/// One timed, positioned unit of spoken content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueLine {
    /// Position within the media item. Immutable once stored.
    pub pos: i32,
    /// Offset from the start of the media file.
    pub start_timestamp: Duration,
    /// Offset from the start of the media file.
    pub end_timestamp: Duration,
    /// Normalized text.
    pub content: String,
    /// File name (not path) of the media this line plays from.
    pub media_file_name: String,
}

impl DialogueLine {
    /// Composite key of this line within `media_id`.
    pub fn id(&self, media_id: &str) -> String {
        format!("{}-{}", media_id, self.pos)
    }

    pub fn duration(&self) -> Duration {
        self.end_timestamp.saturating_sub(self.start_timestamp)
    }
}

impl From<&DialogueLine> for SrtCue {
    fn from(line: &DialogueLine) -> Self {
        SrtCue::new(
            line.pos,
            line.start_timestamp,
            line.end_timestamp,
            line.content.clone(),
        )
    }
}

/// What is known about a media file before its dialogue is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub publication: String,
    pub series: i32,
    pub episode: i32,
    pub media_file_name: String,
}

impl MediaInfo {
    pub fn new(publication: &str, series: i32, episode: i32, media_file_name: &str) -> Self {
        Self {
            publication: publication.to_string(),
            series,
            episode,
            media_file_name: media_file_name.to_string(),
        }
    }

    /// Stable identifier of the episode.
    pub fn media_id(&self) -> String {
        format!(
            "{}-{}",
            self.publication,
            format_series_episode(self.series, self.episode)
        )
    }
}

/// An episode with its full, ordered dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub info: MediaInfo,
    pub dialogue: Vec<DialogueLine>,
}

impl MediaItem {
    pub fn new(info: MediaInfo, dialogue: Vec<DialogueLine>) -> Self {
        Self { info, dialogue }
    }

    pub fn media_id(&self) -> String {
        self.info.media_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_id() {
        let info = MediaInfo::new("xfm", 2, 13, "xfm-S02E13.mp3");
        assert_eq!(info.media_id(), "xfm-S02E13");
        assert_eq!(format_series_episode(1, 104), "S01E104");
    }

    #[test]
    fn test_line_id() {
        let line = DialogueLine {
            pos: 7,
            start_timestamp: Duration::from_secs(1),
            end_timestamp: Duration::from_millis(500),
            content: "hi".to_string(),
            media_file_name: "a.mp3".to_string(),
        };
        assert_eq!(line.id("xfm-S01E01"), "xfm-S01E01-7");
        assert_eq!(line.duration(), Duration::ZERO);
    }
}
