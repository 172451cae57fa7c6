//! Dual-write indexing.
//!
//! A media item lives in two stores that cannot share a transaction: the
//! relational store (positional lookups) and the search index. Each write
//! replaces the whole media item, so replaying an import is always safe.
//! Callers only advance the manifest once [`DualWriteIndexer::import_media_item`]
//! returns `Ok`; any failure leaves the source to be retried whole on the
//! next sweep.

use crate::dialogue::{DialogueLine, MediaItem};
use crate::error::{EarshotError, Result};
use crate::search::SearchIndex;
use crate::store::{DialogContext, DialogStore};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Writes media items to the relational store and the search index.
pub struct DualWriteIndexer {
    store: Arc<dyn DialogStore>,
    index: Arc<dyn SearchIndex>,
}

impl DualWriteIndexer {
    pub fn new(store: Arc<dyn DialogStore>, index: Arc<dyn SearchIndex>) -> Self {
        Self { store, index }
    }

    /// Replace `item` in both stores.
    ///
    /// A relational failure is returned as is, with neither store changed.
    /// A search index failure after the relational commit is returned as
    /// [`EarshotError::PartialWrite`].
    #[instrument(skip(self, item), fields(media_id = %item.media_id(), lines = item.dialogue.len()))]
    pub async fn import_media_item(&self, item: &MediaItem) -> Result<usize> {
        let media_id = item.media_id();

        let stored = self.store.import_media(item).await?;

        let indexed = self.index.replace_media(item).await.map_err(|e| {
            warn!("Search index update for {} failed after store commit: {}", media_id, e);
            EarshotError::PartialWrite {
                media_id: media_id.clone(),
                source: Box::new(e),
            }
        })?;

        if stored != indexed {
            warn!("Store wrote {} lines but index wrote {} for {}", stored, indexed, media_id);
        }

        info!("Imported {} ({} lines)", media_id, stored);
        Ok(stored)
    }

    /// Lines `start..=end` of `media_id`, in order.
    pub async fn get_dialog_range(&self, media_id: &str, start: i32, end: i32) -> Result<Vec<DialogueLine>> {
        self.store.get_dialog_range(media_id, start, end).await
    }

    /// The line before `start` and the line after `end`.
    pub async fn get_dialog_context(&self, media_id: &str, start: i32, end: i32) -> Result<DialogContext> {
        self.store.get_dialog_context(media_id, start, end).await
    }
}
