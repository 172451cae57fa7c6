//! Relational storage for Earshot.
//!
//! Holds the manifest (last-seen modification time per source file) and the
//! dialogue table used for exact positional lookups.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::dialogue::{DialogueLine, MediaItem};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Outcome of recording a modification time in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertResult {
    Created,
    Updated,
    /// Stored time already equal; nothing written.
    Noop,
}

/// The lines immediately around a selected range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogContext {
    /// At most one line, the last one before the range.
    pub before: Vec<DialogueLine>,
    /// At most one line, the first one after the range.
    pub after: Vec<DialogueLine>,
}

/// Change-detection ledger.
#[async_trait]
pub trait ManifestStore: Send + Sync {
    /// Record `mod_time` for `source_path` unless it is already stored.
    async fn manifest_add(&self, source_path: &Path, mod_time: DateTime<Utc>) -> Result<UpsertResult>;

    /// Every recorded source path with its modification time.
    async fn get_manifest(&self) -> Result<HashMap<PathBuf, DateTime<Utc>>>;
}

/// Positional dialogue storage.
#[async_trait]
pub trait DialogStore: Send + Sync {
    /// Replace all lines of `item`'s media ID in one transaction.
    async fn import_media(&self, item: &MediaItem) -> Result<usize>;

    /// Lines with `start <= pos <= end`, ordered by position.
    async fn get_dialog_range(&self, media_id: &str, start: i32, end: i32) -> Result<Vec<DialogueLine>>;

    /// The line before `start` and the line after `end`, where they exist.
    async fn get_dialog_context(&self, media_id: &str, start: i32, end: i32) -> Result<DialogContext>;

    /// Number of stored lines for `media_id`.
    async fn media_line_count(&self, media_id: &str) -> Result<usize>;
}
