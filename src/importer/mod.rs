//! Incremental import of a media directory.
//!
//! A sweep lists the media directory, works out the dialogue source of each
//! media file (a sibling `.srt`, or the media itself when transcription is
//! enabled) and compares the source's modification time with the manifest.
//! Changed sources are rebuilt and written through the dual-write indexer;
//! the manifest only advances once that write succeeded, so any failure is
//! retried on the next sweep.

use crate::audiometa;
use crate::config::ImportSettings;
use crate::dialogue::{DialogueBuilder, MediaItem, MediaNameParser};
use crate::error::{EarshotError, Result};
use crate::indexer::DualWriteIndexer;
use crate::store::ManifestStore;
use crate::subtitle::SrtParser;
use crate::transcription::Transcriber;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Where the dialogue of one media file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A SubRip file next to the media.
    Subtitle { srt: PathBuf, media: PathBuf },
    /// The media itself, via speech-to-text.
    Transcript { media: PathBuf },
}

impl Source {
    /// The file whose modification time is tracked in the manifest.
    pub fn path(&self) -> &Path {
        match self {
            Source::Subtitle { srt, .. } => srt,
            Source::Transcript { media } => media,
        }
    }

    pub fn media(&self) -> &Path {
        match self {
            Source::Subtitle { media, .. } | Source::Transcript { media } => media,
        }
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Sources found in the media directory.
    pub scanned: usize,
    /// Sources unchanged since their last import.
    pub skipped: usize,
    pub imported: usize,
    /// Sources that failed and will be retried next sweep.
    pub failed: Vec<(PathBuf, String)>,
    /// Stopped early because cancellation was requested.
    pub cancelled: bool,
}

/// Drives change detection and import for one media directory.
pub struct Importer {
    media_dir: PathBuf,
    settings: ImportSettings,
    manifest: Arc<dyn ManifestStore>,
    indexer: DualWriteIndexer,
    transcriber: Option<Arc<dyn Transcriber>>,
    names: MediaNameParser,
    srt: SrtParser,
    builder: DialogueBuilder,
}

impl Importer {
    pub fn new(
        media_dir: PathBuf,
        settings: ImportSettings,
        manifest: Arc<dyn ManifestStore>,
        indexer: DualWriteIndexer,
    ) -> Self {
        Self {
            media_dir,
            settings,
            manifest,
            indexer,
            transcriber: None,
            names: MediaNameParser::new(),
            srt: SrtParser::new(),
            builder: DialogueBuilder::new(),
        }
    }

    /// Use `transcriber` for media without subtitles.
    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    /// List the dialogue sources in the media directory, sorted by path.
    pub fn discover(&self) -> Result<Vec<Source>> {
        let mut media: Vec<PathBuf> = std::fs::read_dir(&self.media_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && self.settings.is_media_file(p))
            .collect();
        media.sort();

        let mut sources = Vec::with_capacity(media.len());
        for media in media {
            let srt = media.with_extension("srt");
            if srt.is_file() {
                sources.push(Source::Subtitle { srt, media });
            } else if self.settings.transcribe_missing {
                sources.push(Source::Transcript { media });
            } else {
                debug!("No subtitles for {:?}, skipping", media);
            }
        }
        Ok(sources)
    }

    /// Run one pass over the media directory.
    ///
    /// Cancellation is checked before each source and while waiting on
    /// transcription, never during a store write.
    #[instrument(skip_all, fields(media_dir = %self.media_dir.display()))]
    pub async fn sweep(&self, cancel: &CancellationToken) -> Result<SweepReport> {
        if self.settings.transcribe_missing && self.transcriber.is_none() {
            return Err(EarshotError::Config(
                "import.transcribe_missing is set but no transcriber is configured".to_string(),
            ));
        }

        let sources = self.discover()?;
        let manifest = self.manifest.get_manifest().await?;
        let mut report = SweepReport {
            scanned: sources.len(),
            ..Default::default()
        };

        for source in &sources {
            if cancel.is_cancelled() {
                info!("Sweep cancelled");
                report.cancelled = true;
                break;
            }

            let path = source.path();
            let mod_time = match modification_time(path).await {
                Ok(t) => t,
                Err(e) => {
                    warn!("Cannot stat {:?}: {}", path, e);
                    report.failed.push((path.to_path_buf(), e.to_string()));
                    continue;
                }
            };

            if manifest.get(path) == Some(&mod_time) {
                report.skipped += 1;
                continue;
            }

            match self.import_source(source, mod_time, cancel).await {
                Ok(lines) => {
                    debug!("Imported {:?} ({} lines)", path, lines);
                    report.imported += 1;
                }
                Err(EarshotError::Cancelled) => {
                    info!("Import of {:?} abandoned", path);
                    report.cancelled = true;
                    break;
                }
                Err(e) => {
                    if e.is_malformed() {
                        warn!("Skipping malformed source {:?}: {}", path, e);
                    } else if e.is_partial_write() {
                        error!("Stores out of step for {:?}, will redo on next sweep: {}", path, e);
                    } else {
                        warn!("Import of {:?} failed, will retry: {}", path, e);
                    }
                    report.failed.push((path.to_path_buf(), e.to_string()));
                }
            }
        }

        info!(
            scanned = report.scanned,
            skipped = report.skipped,
            imported = report.imported,
            failed = report.failed.len(),
            "Sweep finished"
        );
        Ok(report)
    }

    /// Build and write one source, then advance its manifest entry.
    async fn import_source(
        &self,
        source: &Source,
        mod_time: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let media = source.media();
        let info = self.names.parse(media).ok_or_else(|| {
            EarshotError::malformed(media, "file name is not <publication>-S<nn>E<nn>")
        })?;

        if self.settings.dump_meta {
            if let Err(e) = audiometa::dump_meta(media).await {
                warn!("Metadata dump for {:?} failed: {}", media, e);
            }
        }

        let item: MediaItem = match source {
            Source::Subtitle { srt, .. } => {
                let cues = self.srt.parse_file(srt).await?;
                self.builder
                    .from_subtitles(&cues, info)
                    .map_err(|reason| EarshotError::malformed(srt, reason))?
            }
            Source::Transcript { media } => {
                let transcriber = self.transcriber.as_ref().ok_or_else(|| {
                    EarshotError::Config("No transcriber configured".to_string())
                })?;
                let transcript = transcriber.transcribe(media, cancel).await?;
                self.builder
                    .from_transcript(&transcript, info)
                    .map_err(|reason| EarshotError::malformed(media, reason))?
            }
        };

        if item.dialogue.is_empty() {
            return Err(EarshotError::malformed(source.path(), "no dialogue lines"));
        }

        let lines = self.indexer.import_media_item(&item).await?;
        self.manifest.manifest_add(source.path(), mod_time).await?;
        Ok(lines)
    }

    /// Sweep now and then every `poll_interval_seconds` until cancelled.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let period = Duration::from_secs(self.settings.poll_interval_seconds.max(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Watching {:?} every {}s", self.media_dir, period.as_secs());

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            match self.sweep(&cancel).await {
                Ok(report) if report.cancelled => break,
                Ok(_) => {}
                Err(e @ EarshotError::Config(_)) => return Err(e),
                Err(e) => error!("Sweep failed: {}", e),
            }
        }

        info!("Import loop stopped");
        Ok(())
    }
}

async fn modification_time(path: &Path) -> Result<DateTime<Utc>> {
    Ok(tokio::fs::metadata(path).await?.modified()?.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::DialogueLine;
    use crate::search::{DialogDocument, SearchIndex, TantivyIndex};
    use crate::searchterms::Term;
    use crate::store::{DialogStore, SqliteStore};
    use crate::transcription::{Transcript, Utterance};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::SystemTime;

    const SRT: &str = "1\n00:00:01,000 --> 00:00:02,000\nFirst line.\n\n2\n00:00:02,500 --> 00:00:04,000\nSecond line.\n";

    struct Fixture {
        dir: tempfile::TempDir,
        store: Arc<SqliteStore>,
        index: Arc<dyn SearchIndex>,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_index(Arc::new(TantivyIndex::in_memory().unwrap()))
        }

        fn with_index(index: Arc<dyn SearchIndex>) -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                store: Arc::new(SqliteStore::in_memory().unwrap()),
                index,
            }
        }

        fn write(&self, name: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, content).unwrap();
            path
        }

        fn importer(&self, settings: ImportSettings) -> Importer {
            let indexer = DualWriteIndexer::new(self.store.clone(), self.index.clone());
            Importer::new(self.dir.path().to_path_buf(), settings, self.store.clone(), indexer)
        }

        async fn manifest_time(&self, path: &Path) -> Option<DateTime<Utc>> {
            self.store.get_manifest().await.unwrap().get(path).copied()
        }
    }

    fn set_mtime(path: &Path, secs_after_epoch: u64) {
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(secs_after_epoch);
        std::fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    struct FakeTranscriber {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transcriber for FakeTranscriber {
        async fn transcribe(&self, _audio_path: &Path, cancel: &CancellationToken) -> Result<Transcript> {
            if cancel.is_cancelled() {
                return Err(EarshotError::Cancelled);
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Transcript {
                utterances: Some(vec![
                    Utterance::new("A", 0, 1000, "Spoken one."),
                    Utterance::new("B", 1000, 2000, "Spoken two."),
                    Utterance::new("A", 2000, 3000, "Spoken three."),
                ]),
                ..Default::default()
            })
        }
    }

    struct BrokenIndex {
        inner: TantivyIndex,
        fail_for: &'static str,
    }

    #[async_trait]
    impl SearchIndex for BrokenIndex {
        async fn replace_media(&self, item: &MediaItem) -> Result<usize> {
            if item.media_id() == self.fail_for {
                return Err(EarshotError::Storage("index offline".to_string()));
            }
            self.inner.replace_media(item).await
        }

        async fn search(&self, terms: &[Term], offset: usize, limit: usize) -> Result<Vec<DialogDocument>> {
            self.inner.search(terms, offset, limit).await
        }

        async fn media_documents(&self, media_id: &str) -> Result<Vec<DialogDocument>> {
            self.inner.media_documents(media_id).await
        }

        async fn document_count(&self) -> Result<u64> {
            self.inner.document_count().await
        }
    }

    #[tokio::test]
    async fn test_sweep_imports_then_skips() {
        let fx = Fixture::new();
        fx.write("xfm-S01E01.mp3", "audio");
        let srt = fx.write("xfm-S01E01.srt", SRT);
        fx.write("notes.txt", "ignored");

        let importer = fx.importer(ImportSettings::default());
        let cancel = CancellationToken::new();

        let first = importer.sweep(&cancel).await.unwrap();
        assert_eq!((first.scanned, first.imported, first.skipped), (1, 1, 0));
        assert!(first.failed.is_empty());

        let lines: Vec<DialogueLine> = fx.store.get_dialog_range("xfm-S01E01", 1, 2).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].content, "Second line.");
        assert_eq!(lines[1].media_file_name, "xfm-S01E01.mp3");
        assert_eq!(fx.index.media_documents("xfm-S01E01").await.unwrap().len(), 2);
        assert!(fx.manifest_time(&srt).await.is_some());

        let second = importer.sweep(&cancel).await.unwrap();
        assert_eq!((second.imported, second.skipped), (0, 1));
    }

    #[tokio::test]
    async fn test_changed_source_is_reimported() {
        let fx = Fixture::new();
        fx.write("xfm-S01E01.mp3", "audio");
        let srt = fx.write("xfm-S01E01.srt", SRT);
        set_mtime(&srt, 1_000_000);

        let importer = fx.importer(ImportSettings::default());
        let cancel = CancellationToken::new();
        importer.sweep(&cancel).await.unwrap();

        fx.write(
            "xfm-S01E01.srt",
            "1\n00:00:01,000 --> 00:00:02,000\nRewritten.\n",
        );
        set_mtime(&srt, 2_000_000);

        let report = importer.sweep(&cancel).await.unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(fx.store.media_line_count("xfm-S01E01").await.unwrap(), 1);
        assert_eq!(
            fx.manifest_time(&srt).await.unwrap().timestamp(),
            2_000_000
        );
    }

    #[tokio::test]
    async fn test_malformed_source_does_not_stop_sweep() {
        let fx = Fixture::new();
        fx.write("xfm-S01E01.mp3", "audio");
        let bad = fx.write("xfm-S01E01.srt", "1\nnot a timing line\nText\n");
        fx.write("xfm-S01E02.mp3", "audio");
        fx.write("xfm-S01E02.srt", SRT);
        fx.write("badname.mp3", "audio");
        fx.write("badname.srt", SRT);

        let report = fx.importer(ImportSettings::default()).sweep(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.scanned, 3);
        assert_eq!(report.imported, 1);
        assert_eq!(report.failed.len(), 2);
        assert!(fx.manifest_time(&bad).await.is_none());
        assert_eq!(fx.store.media_line_count("xfm-S01E02").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_partial_write_keeps_manifest() {
        let fx = Fixture::with_index(Arc::new(BrokenIndex {
            inner: TantivyIndex::in_memory().unwrap(),
            fail_for: "xfm-S01E02",
        }));
        fx.write("xfm-S01E01.mp3", "audio");
        let good = fx.write("xfm-S01E01.srt", SRT);
        fx.write("xfm-S01E02.mp3", "audio");
        let broken = fx.write("xfm-S01E02.srt", SRT);

        let importer = fx.importer(ImportSettings::default());
        let report = importer.sweep(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.imported, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, broken);
        assert!(fx.manifest_time(&good).await.is_some());
        assert!(fx.manifest_time(&broken).await.is_none());
        assert_eq!(fx.store.media_line_count("xfm-S01E01").await.unwrap(), 2);

        // Still pending on the next sweep.
        let again = importer.sweep(&CancellationToken::new()).await.unwrap();
        assert_eq!((again.skipped, again.failed.len()), (1, 1));
    }

    #[tokio::test]
    async fn test_failed_reimport_keeps_previous_mod_time() {
        let fx = Fixture::new();
        fx.write("xfm-S01E01.mp3", "audio");
        let srt = fx.write("xfm-S01E01.srt", SRT);
        set_mtime(&srt, 1_000_000);

        let first = fx.importer(ImportSettings::default()).sweep(&CancellationToken::new()).await.unwrap();
        assert_eq!(first.imported, 1);

        fx.write(
            "xfm-S01E01.srt",
            "1\n00:00:01,000 --> 00:00:02,000\nRewritten.\n",
        );
        set_mtime(&srt, 2_000_000);

        let broken = Arc::new(BrokenIndex {
            inner: TantivyIndex::in_memory().unwrap(),
            fail_for: "xfm-S01E01",
        });
        let importer = Importer::new(
            fx.dir.path().to_path_buf(),
            ImportSettings::default(),
            fx.store.clone(),
            DualWriteIndexer::new(fx.store.clone(), broken),
        );
        let report = importer.sweep(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.imported, 0);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].1.contains("Partial write"));
        // The store took the new lines but the source stays pending.
        assert_eq!(fx.store.media_line_count("xfm-S01E01").await.unwrap(), 1);
        assert_eq!(fx.manifest_time(&srt).await.unwrap().timestamp(), 1_000_000);
    }

    #[tokio::test]
    async fn test_transcribes_media_without_subtitles() {
        let fx = Fixture::new();
        let media = fx.write("pod-S02E03.mp3", "audio");

        let transcriber = Arc::new(FakeTranscriber {
            calls: AtomicUsize::new(0),
        });
        let settings = ImportSettings {
            transcribe_missing: true,
            ..Default::default()
        };
        let importer = fx.importer(settings).with_transcriber(transcriber.clone());

        let report = importer.sweep(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 1);
        assert!(fx.manifest_time(&media).await.is_some());

        let lines = fx.store.get_dialog_range("pod-S02E03", 0, 2).await.unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].content, "Spoken one.");
    }

    #[tokio::test]
    async fn test_transcription_requires_transcriber() {
        let fx = Fixture::new();
        let settings = ImportSettings {
            transcribe_missing: true,
            ..Default::default()
        };
        let err = fx.importer(settings).sweep(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, EarshotError::Config(_)));
    }

    #[tokio::test]
    async fn test_cancelled_sweep_imports_nothing() {
        let fx = Fixture::new();
        fx.write("xfm-S01E01.mp3", "audio");
        fx.write("xfm-S01E01.srt", SRT);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = fx.importer(ImportSettings::default()).sweep(&cancel).await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.imported, 0);
        assert!(fx.store.get_manifest().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let fx = Fixture::new();
        fx.write("xfm-S01E01.mp3", "audio");
        fx.write("xfm-S01E01.srt", SRT);

        let importer = Arc::new(fx.importer(ImportSettings::default()));
        let cancel = CancellationToken::new();
        let handle = {
            let importer = importer.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { importer.run(cancel).await })
        };

        // The first sweep runs immediately.
        for _ in 0..100 {
            if fx.store.media_line_count("xfm-S01E01").await.unwrap() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        cancel.cancel();

        handle.await.unwrap().unwrap();
        assert_eq!(fx.store.media_line_count("xfm-S01E01").await.unwrap(), 2);
    }
}
