//! CLI command implementations.

mod config;
mod dialog;
mod doctor;
mod import;
mod manifest;
mod meta;
mod search;
mod transcribe;

pub use config::run_config;
pub use dialog::run_dialog;
pub use doctor::run_doctor;
pub use import::run_import;
pub use manifest::run_manifest;
pub use meta::run_meta;
pub use search::run_search;
pub use transcribe::run_transcribe;

use crate::config::Settings;
use crate::indexer::DualWriteIndexer;
use crate::search::TantivyIndex;
use crate::store::SqliteStore;
use anyhow::{Context, Result};
use std::sync::Arc;

/// The two on-disk stores, opened from settings.
pub(crate) struct Stores {
    pub sqlite: Arc<SqliteStore>,
    pub index: Arc<TantivyIndex>,
}

impl Stores {
    pub fn open(settings: &Settings) -> Result<Self> {
        let sqlite_path = settings.sqlite_path();
        let sqlite = SqliteStore::new(&sqlite_path)
            .with_context(|| format!("Failed to open database {}", sqlite_path.display()))?;

        let index_path = settings.index_path();
        let index = TantivyIndex::open(&index_path, settings.index.writer_heap_bytes)
            .with_context(|| format!("Failed to open search index {}", index_path.display()))?;

        Ok(Self {
            sqlite: Arc::new(sqlite),
            index: Arc::new(index),
        })
    }

    pub fn indexer(&self) -> DualWriteIndexer {
        DualWriteIndexer::new(self.sqlite.clone(), self.index.clone())
    }
}
