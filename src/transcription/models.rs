//! Data models for transcription.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle of a remote transcription job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptStatus {
    #[default]
    Queued,
    Processing,
    Completed,
    Error,
}

impl TranscriptStatus {
    /// Whether polling can stop.
    pub fn is_terminal(self) -> bool {
        matches!(self, TranscriptStatus::Completed | TranscriptStatus::Error)
    }
}

/// A complete transcription result as returned by the service.
///
/// This is also the cached form, so unknown fields are ignored and
/// missing ones default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Transcript {
    /// Remote job ID.
    pub id: String,
    pub status: TranscriptStatus,
    /// Full transcript text.
    pub text: Option<String>,
    /// Speaker-labelled segments, in spoken order.
    pub utterances: Option<Vec<Utterance>>,
    /// Audio length in seconds.
    pub audio_duration: Option<f64>,
    /// Failure description when `status` is `error`.
    pub error: Option<String>,
}

impl Transcript {
    /// Utterances, or an empty slice if the service returned none.
    pub fn utterances(&self) -> &[Utterance] {
        self.utterances.as_deref().unwrap_or_default()
    }

    /// Total audio duration.
    pub fn duration(&self) -> Duration {
        self.audio_duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(Duration::from_secs_f64)
            .unwrap_or_default()
    }
}

/// One speaker turn. Times are milliseconds from the start of the audio.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Utterance {
    pub speaker: String,
    pub start: u64,
    pub end: u64,
    pub text: String,
    pub confidence: f64,
}

impl Utterance {
    pub fn new(speaker: &str, start: u64, end: u64, text: &str) -> Self {
        Self {
            speaker: speaker.to_string(),
            start,
            end,
            text: text.to_string(),
            confidence: 1.0,
        }
    }

    pub fn start_offset(&self) -> Duration {
        Duration::from_millis(self.start)
    }

    pub fn end_offset(&self) -> Duration {
        Duration::from_millis(self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_service_payload() {
        let json = r#"{
            "id": "abc123",
            "status": "completed",
            "text": "Hello. Hi.",
            "audio_duration": 12.5,
            "language_code": "en_us",
            "utterances": [
                {"speaker": "A", "start": 250, "end": 1200, "text": "Hello.", "confidence": 0.9, "words": []},
                {"speaker": "B", "start": 1300, "end": 2000, "text": "Hi."}
            ]
        }"#;

        let transcript: Transcript = serde_json::from_str(json).unwrap();
        assert_eq!(transcript.status, TranscriptStatus::Completed);
        assert_eq!(transcript.utterances().len(), 2);
        assert_eq!(transcript.utterances()[1].speaker, "B");
        assert_eq!(transcript.utterances()[0].start_offset(), Duration::from_millis(250));
        assert_eq!(transcript.duration(), Duration::from_millis(12_500));
    }

    #[test]
    fn test_status_terminal() {
        assert!(!TranscriptStatus::Queued.is_terminal());
        assert!(!TranscriptStatus::Processing.is_terminal());
        assert!(TranscriptStatus::Completed.is_terminal());
        assert!(TranscriptStatus::Error.is_terminal());
    }
}
