//! On-disk transcript cache.
//!
//! Each media file gets a sibling `<file name>.json` holding the raw
//! service result together with the media file's modification time at the
//! moment it was transcribed. An entry recorded for a different
//! modification time is treated as absent.

use super::{Transcriber, Transcript};
use crate::error::{EarshotError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// A persisted transcription result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedTranscript {
    pub source_path: PathBuf,
    pub source_mod_time: DateTime<Utc>,
    pub transcript: Transcript,
}

/// Reads and writes cache entries next to media files.
#[derive(Debug, Clone, Default)]
pub struct TranscriptCache;

impl TranscriptCache {
    pub fn new() -> Self {
        Self
    }

    /// Location of the cache entry for `media_path`.
    pub fn cache_path(media_path: &Path) -> PathBuf {
        let mut name = media_path.as_os_str().to_owned();
        name.push(".json");
        PathBuf::from(name)
    }

    /// Look up a transcript for `media_path` as it was at `mod_time`.
    pub fn load(&self, media_path: &Path, mod_time: DateTime<Utc>) -> Result<Option<Transcript>> {
        let cache_path = Self::cache_path(media_path);
        let content = match std::fs::read_to_string(&cache_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: CachedTranscript = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Ignoring unreadable transcript cache {:?}: {}", cache_path, e);
                return Ok(None);
            }
        };

        if entry.source_mod_time != mod_time {
            debug!(
                "Transcript cache for {:?} is stale ({} != {})",
                media_path, entry.source_mod_time, mod_time
            );
            return Ok(None);
        }

        Ok(Some(entry.transcript))
    }

    /// Persist a transcript. The entry appears atomically or not at all.
    pub fn store(&self, media_path: &Path, mod_time: DateTime<Utc>, transcript: &Transcript) -> Result<()> {
        let cache_path = Self::cache_path(media_path);
        let dir = cache_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let entry = CachedTranscript {
            source_path: media_path.to_path_buf(),
            source_mod_time: mod_time,
            transcript: transcript.clone(),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut tmp, &entry)?;
        tmp.flush()?;
        tmp.persist(&cache_path).map_err(|e| EarshotError::Io(e.error))?;

        debug!("Cached transcript at {:?}", cache_path);
        Ok(())
    }
}

/// Wraps a [`Transcriber`] so each media file is sent to it at most once
/// per modification time.
pub struct CachingTranscriber {
    inner: Arc<dyn Transcriber>,
    cache: TranscriptCache,
}

impl CachingTranscriber {
    pub fn new(inner: Arc<dyn Transcriber>) -> Self {
        Self {
            inner,
            cache: TranscriptCache::new(),
        }
    }
}

#[async_trait]
impl Transcriber for CachingTranscriber {
    #[instrument(skip(self, cancel), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path, cancel: &CancellationToken) -> Result<Transcript> {
        let mod_time: DateTime<Utc> = tokio::fs::metadata(audio_path).await?.modified()?.into();

        if let Some(transcript) = self.cache.load(audio_path, mod_time)? {
            debug!("Using cached transcript");
            return Ok(transcript);
        }

        info!("No cached transcript, submitting job");
        let transcript = self.inner.transcribe(audio_path, cancel).await?;
        self.cache.store(audio_path, mod_time, &transcript)?;

        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::{TranscriptStatus, Utterance};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTranscriber {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingTranscriber {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl Transcriber for CountingTranscriber {
        async fn transcribe(&self, _audio_path: &Path, _cancel: &CancellationToken) -> Result<Transcript> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EarshotError::Transcription("service unavailable".to_string()));
            }
            Ok(Transcript {
                id: "job-1".to_string(),
                status: TranscriptStatus::Completed,
                utterances: Some(vec![Utterance::new("A", 0, 1000, "Hello.")]),
                ..Default::default()
            })
        }
    }

    fn media_file(dir: &Path) -> PathBuf {
        let path = dir.join("show-S01E01.mp3");
        std::fs::write(&path, b"fake audio").unwrap();
        path
    }

    #[test]
    fn test_cache_path_appends_json() {
        assert_eq!(
            TranscriptCache::cache_path(Path::new("/media/show-S01E01.mp3")),
            PathBuf::from("/media/show-S01E01.mp3.json")
        );
    }

    #[tokio::test]
    async fn test_second_call_hits_cache() {
        let dir = tempfile::tempdir().unwrap();
        let media = media_file(dir.path());
        let inner = CountingTranscriber::new(false);
        let transcriber = CachingTranscriber::new(inner.clone());
        let cancel = CancellationToken::new();

        let first = transcriber.transcribe(&media, &cancel).await.unwrap();
        let second = transcriber.transcribe(&media, &cancel).await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.id, second.id);
        assert_eq!(second.utterances()[0].text, "Hello.");
    }

    #[tokio::test]
    async fn test_stale_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let media = media_file(dir.path());
        let cache = TranscriptCache::new();

        let recorded = DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        cache.store(&media, recorded, &Transcript::default()).unwrap();

        assert!(cache.load(&media, recorded).unwrap().is_some());
        assert!(cache
            .load(&media, recorded + chrono::Duration::seconds(1))
            .unwrap()
            .is_none());

        // The wrapper sees the real mtime, which differs from the recorded one.
        let inner = CountingTranscriber::new(false);
        CachingTranscriber::new(inner.clone())
            .transcribe(&media, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_writes_no_entry() {
        let dir = tempfile::tempdir().unwrap();
        let media = media_file(dir.path());
        let transcriber = CachingTranscriber::new(CountingTranscriber::new(true));

        let result = transcriber.transcribe(&media, &CancellationToken::new()).await;
        assert!(matches!(result, Err(EarshotError::Transcription(_))));
        assert!(!TranscriptCache::cache_path(&media).exists());
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let media = media_file(dir.path());
        std::fs::write(TranscriptCache::cache_path(&media), "{not json").unwrap();

        assert!(TranscriptCache::new().load(&media, Utc::now()).unwrap().is_none());
    }
}
