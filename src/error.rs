//! Error types for Earshot.

use crate::searchterms::ParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Library-level error type for Earshot operations.
#[derive(Error, Debug)]
pub enum EarshotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Metadata probe failed: {0}")]
    Probe(String),

    #[error("Malformed source {}: {reason}", path.display())]
    MalformedSource { path: PathBuf, reason: String },

    #[error("Invalid query: {0}")]
    Query(#[from] ParseError),

    /// The relational store committed but the search index did not.
    #[error("Partial write for {media_id}: dialogue stored but search index update failed: {source}")]
    PartialWrite {
        media_id: String,
        #[source]
        source: Box<EarshotError>,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Search index error: {0}")]
    Index(#[from] tantivy::TantivyError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl EarshotError {
    /// Shorthand for a [`EarshotError::MalformedSource`].
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        EarshotError::MalformedSource {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True when one store holds the new data and the other does not.
    pub fn is_partial_write(&self) -> bool {
        matches!(self, EarshotError::PartialWrite { .. })
    }

    /// True for input that will fail the same way until the file or query changes.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            EarshotError::MalformedSource { .. } | EarshotError::Query(_)
        )
    }
}

/// Result type alias for Earshot operations.
pub type Result<T> = std::result::Result<T, EarshotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_write_is_distinct() {
        let err = EarshotError::PartialWrite {
            media_id: "xfm-S01E01".to_string(),
            source: Box::new(EarshotError::Transcription("boom".to_string())),
        };
        assert!(err.is_partial_write());
        assert!(!err.is_malformed());
        assert!(err.to_string().contains("xfm-S01E01"));
    }

    #[test]
    fn test_malformed_classification() {
        let err = EarshotError::malformed("/media/bad.srt", "missing timing line");
        assert!(err.is_malformed());
        assert!(err.to_string().contains("/media/bad.srt"));
    }
}
