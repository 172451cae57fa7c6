//! Configuration settings for Earshot.

use crate::error::{EarshotError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub store: StoreSettings,
    pub index: IndexSettings,
    pub import: ImportSettings,
    pub transcription: TranscriptionSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.earshot".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Relational store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Path to the SQLite database.
    pub sqlite_path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.earshot/dialog.db".to_string(),
        }
    }
}

/// Search index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Directory holding the search index.
    pub path: String,
    /// Results per page when a query does not say otherwise.
    pub default_limit: usize,
    /// Memory budget of the index writer.
    pub writer_heap_bytes: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            path: "~/.earshot/index".to_string(),
            default_limit: 25,
            writer_heap_bytes: 50_000_000,
        }
    }
}

/// Import sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Directory scanned for media files (not recursive).
    pub media_dir: Option<String>,
    /// Seconds between sweeps in watch mode.
    pub poll_interval_seconds: u64,
    /// Transcribe media that has no sibling `.srt`.
    pub transcribe_missing: bool,
    /// Write cover art and tags next to each imported media file.
    pub dump_meta: bool,
    pub audio_extensions: Vec<String>,
    pub video_extensions: Vec<String>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        let list = |exts: &[&str]| -> Vec<String> { exts.iter().map(|e| e.to_string()).collect() };
        Self {
            media_dir: None,
            poll_interval_seconds: 60,
            transcribe_missing: false,
            dump_meta: false,
            audio_extensions: list(&["mp3", "wav", "flac", "aac", "ogg", "opus", "m4a"]),
            video_extensions: list(&["mp4", "mkv", "avi", "mov", "webm", "m4v"]),
        }
    }
}

impl ImportSettings {
    /// Whether `path` has one of the configured media extensions.
    pub fn is_media_file(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.audio_extensions
            .iter()
            .chain(&self.video_extensions)
            .any(|known| known.eq_ignore_ascii_case(ext))
    }
}

/// Speech-to-text service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    pub base_url: String,
    /// API key. Falls back to `ASSEMBLYAI_API_KEY` when unset.
    pub api_key: Option<String>,
    /// Seconds between job status checks.
    pub poll_interval_seconds: u64,
    /// Give up on a job after this many seconds.
    pub timeout_seconds: u64,
    pub speaker_labels: bool,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.assemblyai.com".to_string(),
            api_key: None,
            poll_interval_seconds: 3,
            timeout_seconds: 3600,
            speaker_labels: true,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| EarshotError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("earshot")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.store.sqlite_path)
    }

    /// Get the expanded search index directory.
    pub fn index_path(&self) -> PathBuf {
        Self::expand_path(&self.index.path)
    }

    /// The configured media directory. It must exist.
    pub fn media_dir(&self) -> Result<PathBuf> {
        let raw = self
            .import
            .media_dir
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| EarshotError::Config("import.media_dir is not set".to_string()))?;

        let dir = Self::expand_path(raw);
        if !dir.is_dir() {
            return Err(EarshotError::Config(format!(
                "Media directory {} does not exist",
                dir.display()
            )));
        }
        Ok(dir)
    }
}
