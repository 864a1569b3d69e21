//! Relational store access: paging documents, loading the vocabulary and
//! persisting classified relations.

pub mod memory;
pub mod postgres;

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;

use crate::{
    data::{documents::Document, keywords::KeywordRecord},
    error::RowError,
    pipeline::merge::ResultRow,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Factory for independent store sessions. Each worker opens its own.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn open(&self) -> Result<Box<dyn StoreSession>>;
}

/// One connection to the store. Sessions are never shared between workers.
#[async_trait]
pub trait StoreSession: Send {
    async fn load_keywords(&mut self) -> Result<Vec<KeywordRecord>>;

    async fn fetch_documents(&mut self, limit: i64, offset: i64) -> Result<Vec<Document>>;

    /// Insert distinct sentences, then one relationship per row, in one transaction.
    /// Row failures are collected into the report instead of aborting the batch.
    async fn write_results(&mut self, rows: &[ResultRow]) -> Result<WriteReport>;
}

/// Outcome of persisting one batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub sentences_written: usize,
    pub relations_written: usize,
    pub failures: Vec<RowError>,
}

impl WriteReport {
    pub fn error_count(&self) -> usize {
        self.failures.len()
    }

    pub fn merge(&mut self, other: WriteReport) {
        self.sentences_written += other.sentences_written;
        self.relations_written += other.relations_written;
        self.failures.extend(other.failures);
    }
}

/// Sentence row to insert: the first document it was seen in owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceGroup {
    pub sentence: String,
    pub document_id: i64,
}

/// Distinct sentence texts in first-seen order.
pub fn unique_sentences(rows: &[ResultRow]) -> Vec<SentenceGroup> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(rows.len());
    let mut groups = Vec::new();
    for row in rows {
        if seen.insert(row.sentence.as_str()) {
            groups.push(SentenceGroup {
                sentence: row.sentence.clone(),
                document_id: row.document_id,
            });
        }
    }
    groups
}

/// Label persisted for a row; unclassified rows are stored with an empty category.
pub(crate) fn category_label(row: &ResultRow) -> &'static str {
    row.category.map(|c| c.as_str()).unwrap_or("")
}
