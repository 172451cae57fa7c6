//! Conversion of subtitles and transcripts into dialogue lines.

use super::{DialogueLine, MediaInfo, MediaItem};
use crate::subtitle::SrtCue;
use crate::transcription::Transcript;
use regex::Regex;
use std::time::Duration;

/// Builds the canonical, ordered dialogue for one media item.
///
/// Positions increase by one per emitted line, starting at the first cue's
/// sequence number for subtitles and at 0 for transcripts. Cues or
/// utterances whose text normalizes to nothing are dropped without
/// consuming a position. Building fails, with a reason, if positions would
/// run past `i32::MAX`.
pub struct DialogueBuilder {
    markup: Regex,
}

impl DialogueBuilder {
    pub fn new() -> Self {
        Self {
            // HTML-style tags (<i>, <font ...>) and SSA override blocks ({\an8})
            markup: Regex::new(r"<[^>]*>|\{[^}]*\}").expect("static markup pattern"),
        }
    }

    /// Build from pre-timed subtitle cues.
    pub fn from_subtitles(&self, cues: &[SrtCue], info: MediaInfo) -> Result<MediaItem, String> {
        let first_pos = cues.first().map_or(1, |c| c.index);
        let lines = cues
            .iter()
            .map(|c| (c.start, c.end, c.text.as_str()));

        self.build(first_pos, lines, info)
    }

    /// Build from a speaker-labelled transcript.
    ///
    /// A transcript without utterances but with text becomes a single line
    /// spanning the whole audio.
    pub fn from_transcript(&self, transcript: &Transcript, info: MediaInfo) -> Result<MediaItem, String> {
        let utterances = transcript.utterances();
        if utterances.is_empty() {
            let text = transcript.text.as_deref().unwrap_or_default();
            let whole = std::iter::once((Duration::ZERO, transcript.duration(), text));
            return self.build(0, whole, info);
        }

        let lines = utterances
            .iter()
            .map(|u| (u.start_offset(), u.end_offset(), u.text.as_str()));

        self.build(0, lines, info)
    }

    fn build<'a>(
        &self,
        first_pos: i32,
        lines: impl Iterator<Item = (Duration, Duration, &'a str)>,
        info: MediaInfo,
    ) -> Result<MediaItem, String> {
        let mut dialogue: Vec<DialogueLine> = Vec::new();

        for (start, end, raw) in lines {
            let content = self.normalize(raw);
            if content.is_empty() {
                continue;
            }
            let pos = match dialogue.last() {
                Some(prev) => prev
                    .pos
                    .checked_add(1)
                    .ok_or_else(|| format!("too many lines after position {}", prev.pos))?,
                None => first_pos,
            };
            dialogue.push(DialogueLine {
                pos,
                start_timestamp: start,
                end_timestamp: end.max(start),
                content,
                media_file_name: info.media_file_name.clone(),
            });
        }

        Ok(MediaItem::new(info, dialogue))
    }

    /// Strip markup and control characters and collapse whitespace.
    pub fn normalize(&self, raw: &str) -> String {
        let stripped = self.markup.replace_all(raw, " ");
        stripped
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for DialogueBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::Utterance;

    fn info() -> MediaInfo {
        MediaInfo::new("xfm", 1, 2, "xfm-S01E02.mp3")
    }

    #[test]
    fn test_normalize() {
        let builder = DialogueBuilder::new();
        assert_eq!(builder.normalize("<i>Hello</i>\nthere"), "Hello there");
        assert_eq!(builder.normalize("{\\an8}Top\tline\u{0007}"), "Top line");
        assert_eq!(builder.normalize("  <b></b>  "), "");
    }

    #[test]
    fn test_from_subtitles_keeps_source_numbering() {
        let cues = vec![
            SrtCue::new(5, Duration::from_secs(1), Duration::from_secs(2), "First"),
            SrtCue::new(6, Duration::from_secs(2), Duration::from_secs(3), "<i></i>"),
            SrtCue::new(9, Duration::from_secs(3), Duration::from_secs(4), "Second\nline"),
        ];

        let item = DialogueBuilder::new().from_subtitles(&cues, info()).unwrap();
        assert_eq!(item.media_id(), "xfm-S01E02");
        assert_eq!(item.dialogue.len(), 2);
        assert_eq!(item.dialogue[0].pos, 5);
        assert_eq!(item.dialogue[1].pos, 6);
        assert_eq!(item.dialogue[1].content, "Second line");
        assert_eq!(item.dialogue[1].start_timestamp, Duration::from_secs(3));
        assert_eq!(item.dialogue[1].media_file_name, "xfm-S01E02.mp3");
    }

    #[test]
    fn test_positions_up_to_i32_max() {
        let builder = DialogueBuilder::new();
        let at_max = vec![
            SrtCue::new(i32::MAX - 1, Duration::from_secs(1), Duration::from_secs(2), "A"),
            SrtCue::new(i32::MAX, Duration::from_secs(2), Duration::from_secs(3), "B"),
        ];
        let item = builder.from_subtitles(&at_max, info()).unwrap();
        assert_eq!(item.dialogue[1].pos, i32::MAX);

        let single = vec![SrtCue::new(i32::MAX, Duration::ZERO, Duration::from_secs(1), "hi")];
        assert_eq!(builder.from_subtitles(&single, info()).unwrap().dialogue[0].pos, i32::MAX);

        let past_max = vec![
            SrtCue::new(i32::MAX, Duration::ZERO, Duration::from_secs(1), "hi"),
            SrtCue::new(i32::MAX, Duration::from_secs(1), Duration::from_secs(2), "again"),
        ];
        let err = builder.from_subtitles(&past_max, info()).unwrap_err();
        assert!(err.contains("too many lines"));
    }

    #[test]
    fn test_from_transcript() {
        let transcript = Transcript {
            utterances: Some(vec![
                Utterance::new("A", 0, 1500, "Right, okay."),
                Utterance::new("B", 1500, 1200, "Go on then."),
            ]),
            ..Default::default()
        };

        let item = DialogueBuilder::new().from_transcript(&transcript, info()).unwrap();
        let positions: Vec<i32> = item.dialogue.iter().map(|d| d.pos).collect();
        assert_eq!(positions, vec![0, 1]);
        assert_eq!(item.dialogue[0].end_timestamp, Duration::from_millis(1500));
        // end never precedes start
        assert_eq!(item.dialogue[1].end_timestamp, Duration::from_millis(1500));
    }

    #[test]
    fn test_from_transcript_without_utterances() {
        let transcript = Transcript {
            text: Some("Just one block.".to_string()),
            audio_duration: Some(30.0),
            ..Default::default()
        };
        let item = DialogueBuilder::new().from_transcript(&transcript, info()).unwrap();
        assert_eq!(item.dialogue.len(), 1);
        assert_eq!(item.dialogue[0].end_timestamp, Duration::from_secs(30));

        let empty = DialogueBuilder::new()
            .from_transcript(&Transcript::default(), info())
            .unwrap();
        assert!(empty.dialogue.is_empty());
    }
}
