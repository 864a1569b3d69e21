//! Typed domain errors surfaced by the extraction and persistence layers.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal configuration problems detected before any processing starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Recoverable failure to load a single document's text.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DocumentError {
    /// Path of the offending document.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Missing(path) => path,
            Self::Read { path, .. } => path,
        }
    }
}

/// Per-row store write failure. Collected, never propagated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("sentence insert failed for document {document_id}: {message}")]
    Sentence { document_id: i64, message: String },
    #[error("relationship insert failed for document {document_id} ({keyword_1}, {keyword_2}): {message}")]
    Relation {
        document_id: i64,
        keyword_1: String,
        keyword_2: String,
        message: String,
    },
    #[error("no stored sentence for ({keyword_1}, {keyword_2}) in document {document_id}")]
    UnresolvedSentence {
        document_id: i64,
        keyword_1: String,
        keyword_2: String,
    },
}
