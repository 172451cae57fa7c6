//! Earshot - Dialogue search for episodic audio and video
//!
//! Earshot watches a directory of episodes (`<publication>-S<nn>E<nn>.<ext>`),
//! turns each episode's subtitles or speech-to-text transcript into numbered
//! dialogue lines, and keeps those lines in two stores: a SQLite table for
//! exact positional lookups and a Tantivy index for quote search.
//!
//! # Architecture
//!
//! - `importer` - Change detection sweep and poll loop
//! - `store` - Manifest and positional dialogue storage (SQLite)
//! - `transcription` - Speech-to-text client and transcript cache
//! - `audiometa` - ffprobe/ffmpeg metadata and cover dumps
//! - `subtitle` - SubRip parsing and rendering
//! - `dialogue` - Dialogue lines, media items and naming
//! - `indexer` - Dual writes to the store and the search index
//! - `search` - Search index (Tantivy)
//! - `searchterms` - Query language parser
//!
//! # Example
//!
//! ```rust,no_run
//! use earshot::search::{SearchIndex, TantivyIndex};
//! use earshot::searchterms::{extract_offset, QueryParser};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let index = TantivyIndex::open("/var/lib/earshot/index".as_ref(), 50_000_000)?;
//!
//!     let terms = QueryParser::new().parse(r#""pub quiz" series:>=2 offset:10"#)?;
//!     let (terms, offset) = extract_offset(terms);
//!
//!     for doc in index.search(&terms, offset.unwrap_or(0), 10).await? {
//!         println!("{} #{}: {}", doc.media_id, doc.pos, doc.content);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod audiometa;
pub mod cli;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod importer;
pub mod indexer;
pub mod search;
pub mod searchterms;
pub mod store;
pub mod subtitle;
pub mod transcription;

pub use error::{EarshotError, Result};
