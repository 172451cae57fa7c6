//! SubRip subtitle support.
//!
//! Subtitle files are one of the two dialogue sources (the other being
//! speech-to-text transcripts). Cues are parsed here and turned into
//! dialogue lines by [`crate::dialogue::DialogueBuilder`].

mod format;
mod parser;

pub use format::{format_srt, format_srt_timestamp};
pub use parser::SrtParser;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single timed subtitle cue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrtCue {
    /// Sequence number as written in the file.
    pub index: i32,
    /// Offset from the start of the media.
    pub start: Duration,
    /// Offset from the start of the media.
    pub end: Duration,
    /// Raw cue text; multiple lines are joined with `\n`.
    pub text: String,
}

impl SrtCue {
    pub fn new(index: i32, start: Duration, end: Duration, text: impl Into<String>) -> Self {
        Self {
            index,
            start,
            end,
            text: text.into(),
        }
    }
}
