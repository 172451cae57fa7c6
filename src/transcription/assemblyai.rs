//! AssemblyAI speech-to-text client.

use super::{Transcriber, Transcript, TranscriptStatus};
use crate::config::TranscriptionSettings;
use crate::error::{EarshotError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use url::Url;

/// Environment variable consulted when no key is configured.
pub const API_KEY_ENV: &str = "ASSEMBLYAI_API_KEY";

/// Timeout for a single HTTP request (the upload is the slow one).
const REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Serialize)]
struct TranscriptRequest<'a> {
    audio_url: &'a str,
    speaker_labels: bool,
}

/// Transcriber backed by the AssemblyAI REST API.
///
/// A job is uploaded, submitted and then polled until it completes.
pub struct AssemblyAiTranscriber {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    poll_interval: Duration,
    job_timeout: Duration,
    speaker_labels: bool,
}

impl AssemblyAiTranscriber {
    /// Create a client for `base_url` with default polling behaviour.
    pub fn new(api_key: &str, base_url: &str) -> Result<Self> {
        Self::with_config(
            api_key,
            base_url,
            Duration::from_secs(3),
            Duration::from_secs(3600),
            true,
        )
    }

    pub fn with_config(
        api_key: &str,
        base_url: &str,
        poll_interval: Duration,
        job_timeout: Duration,
        speaker_labels: bool,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(EarshotError::Config(format!(
                "AssemblyAI API key is empty. Set transcription.api_key or {}",
                API_KEY_ENV
            )));
        }

        let base_url = Url::parse(base_url)
            .map_err(|e| EarshotError::Config(format!("Invalid transcription base_url '{}': {}", base_url, e)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.to_string(),
            poll_interval,
            job_timeout,
            speaker_labels,
        })
    }

    /// Build a client from settings, falling back to the environment for the key.
    pub fn from_settings(settings: &TranscriptionSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .ok_or_else(|| {
                EarshotError::Config(format!(
                    "No AssemblyAI API key. Set transcription.api_key or export {}",
                    API_KEY_ENV
                ))
            })?;

        Self::with_config(
            &api_key,
            &settings.base_url,
            Duration::from_secs(settings.poll_interval_seconds.max(1)),
            Duration::from_secs(settings.timeout_seconds),
            settings.speaker_labels,
        )
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| EarshotError::Config(format!("Invalid endpoint '{}': {}", path, e)))
    }

    /// Upload raw audio, returning the service-side URL for it.
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn upload(&self, audio_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(audio_path).await?;
        debug!("Uploading {} bytes", bytes.len());

        let response: UploadResponse = self
            .http
            .post(self.endpoint("/v2/upload")?)
            .header("authorization", &self.api_key)
            .body(bytes)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.upload_url)
    }

    async fn submit(&self, audio_url: &str) -> Result<Transcript> {
        let request = TranscriptRequest {
            audio_url,
            speaker_labels: self.speaker_labels,
        };

        let transcript = self
            .http
            .post(self.endpoint("/v2/transcript")?)
            .header("authorization", &self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(transcript)
    }

    async fn fetch(&self, id: &str) -> Result<Transcript> {
        let transcript = self
            .http
            .get(self.endpoint(&format!("/v2/transcript/{}", id))?)
            .header("authorization", &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(transcript)
    }

    async fn wait_for_completion(&self, mut transcript: Transcript) -> Result<Transcript> {
        while !transcript.status.is_terminal() {
            tokio::time::sleep(self.poll_interval).await;
            transcript = self.fetch(&transcript.id).await?;
            debug!(id = %transcript.id, status = ?transcript.status, "Polled transcript");
        }

        if transcript.status == TranscriptStatus::Error {
            return Err(EarshotError::Transcription(
                transcript
                    .error
                    .unwrap_or_else(|| format!("job {} failed without a reason", transcript.id)),
            ));
        }

        Ok(transcript)
    }
}

#[async_trait]
impl Transcriber for AssemblyAiTranscriber {
    #[instrument(skip(self, cancel), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path, cancel: &CancellationToken) -> Result<Transcript> {
        let upload_url = until_cancelled(cancel, self.upload(audio_path)).await?;
        let job = until_cancelled(cancel, self.submit(&upload_url)).await?;
        info!(id = %job.id, "Submitted transcription job");

        let completed = until_cancelled(cancel, async {
            match tokio::time::timeout(self.job_timeout, self.wait_for_completion(job)).await {
                Ok(result) => result,
                Err(_) => Err(EarshotError::Transcription(format!(
                    "job did not finish within {}s",
                    self.job_timeout.as_secs()
                ))),
            }
        })
        .await?;

        info!(
            id = %completed.id,
            utterances = completed.utterances().len(),
            "Transcription complete"
        );
        Ok(completed)
    }
}

/// Await `fut` unless `cancel` fires first.
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(EarshotError::Cancelled),
        result = fut => result,
    }
}

/// Check if an AssemblyAI key is available from the environment.
pub fn is_api_key_configured() -> bool {
    std::env::var(API_KEY_ENV).is_ok_and(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_rejected() {
        let err = AssemblyAiTranscriber::new("  ", "https://api.assemblyai.com").err().unwrap();
        assert!(matches!(err, EarshotError::Config(_)));
    }

    #[test]
    fn test_endpoint_join() {
        let client = AssemblyAiTranscriber::new("key", "http://localhost:8080/").unwrap();
        assert_eq!(
            client.endpoint("/v2/transcript/abc").unwrap().as_str(),
            "http://localhost:8080/v2/transcript/abc"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = AssemblyAiTranscriber::new("key", "not a url").err().unwrap();
        assert!(matches!(err, EarshotError::Config(_)));
    }

    #[tokio::test]
    async fn test_cancelled_before_upload() {
        let client = AssemblyAiTranscriber::new("key", "http://127.0.0.1:9/").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client
            .transcribe(Path::new("/nonexistent/audio.mp3"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, EarshotError::Cancelled));
    }
}
