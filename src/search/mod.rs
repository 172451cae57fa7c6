//! Full-text search over dialogue.
//!
//! Each dialogue line is one [`DialogDocument`]. Documents are replaced per
//! media item, so the index holds exactly the lines of the last successful
//! import of every episode.

mod document;
mod tantivy_index;

pub use document::{schema_field, Accessor, DialogDocument, FieldSpec, DIALOG_SCHEMA, ID_FIELD, MEDIA_ID_FIELD};
pub use tantivy_index::TantivyIndex;

use crate::dialogue::MediaItem;
use crate::error::Result;
use crate::searchterms::Term;
use async_trait::async_trait;

/// Trait for dialogue search backends.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Replace every document of `item`'s media ID with its current
    /// dialogue. Either all changes become visible or none do.
    ///
    /// Returns the number of documents written.
    async fn replace_media(&self, item: &MediaItem) -> Result<usize>;

    /// Find documents matching all `terms`. No terms means no results.
    async fn search(&self, terms: &[Term], offset: usize, limit: usize) -> Result<Vec<DialogDocument>>;

    /// All documents of one media item, ordered by position.
    async fn media_documents(&self, media_id: &str) -> Result<Vec<DialogDocument>>;

    /// Total number of indexed documents.
    async fn document_count(&self) -> Result<u64>;
}
