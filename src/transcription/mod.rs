//! Transcription module for Earshot.
//!
//! Media without subtitles is sent to a speech-to-text service. That call is
//! slow and billed, so results are cached next to the media file and reused
//! for as long as the media file is unchanged.

mod assemblyai;
mod cache;
mod models;

pub use assemblyai::{is_api_key_configured, AssemblyAiTranscriber, API_KEY_ENV};
pub use cache::{CachedTranscript, CachingTranscriber, TranscriptCache};
pub use models::{Transcript, TranscriptStatus, Utterance};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file into speaker-labelled utterances.
    ///
    /// Implementations stop waiting and return
    /// [`crate::EarshotError::Cancelled`] once `cancel` fires.
    async fn transcribe(&self, audio_path: &Path, cancel: &CancellationToken) -> Result<Transcript>;
}
