//! In-process store used by tests and local experiments. Mirrors the relational
//! schema closely enough to exercise the write path, including the
//! `(sentences, document_id)` uniqueness constraint.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use super::{category_label, unique_sentences, DocumentStore, StoreSession, WriteReport};
use crate::{
    data::{documents::Document, keywords::KeywordRecord},
    error::RowError,
    pipeline::merge::ResultRow,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSentence {
    pub id: i64,
    pub sentence: String,
    pub document_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRelationship {
    pub id: i64,
    pub document_id: i64,
    pub sentence_id: i64,
    pub keyword1: String,
    pub keyword2: String,
    pub category: String,
}

#[derive(Debug, Default)]
pub struct MemoryState {
    pub keywords: Vec<KeywordRecord>,
    pub documents: Vec<Document>,
    pub sentences: Vec<StoredSentence>,
    pub relationships: Vec<StoredRelationship>,
    /// Offsets whose page fetch fails, simulating a broken worker connection.
    pub failing_offsets: HashSet<i64>,
    /// Every batch write fails, simulating a lost connection during persistence.
    pub failing_writes: bool,
    pub sessions_opened: usize,
}

/// Shared in-memory store; clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new(keywords: Vec<KeywordRecord>, documents: Vec<Document>) -> Self {
        let store = Self::default();
        {
            let mut state = store.lock_state();
            state.keywords = keywords;
            state.documents = documents;
        }
        store
    }

    /// Make the page fetch at `offset` fail.
    pub fn fail_offset(&self, offset: i64) {
        self.lock_state().failing_offsets.insert(offset);
    }

    /// Make every subsequent batch write fail.
    pub fn fail_writes(&self) {
        self.lock_state().failing_writes = true;
    }

    pub fn sentences(&self) -> Vec<StoredSentence> {
        self.lock_state().sentences.clone()
    }

    pub fn relationships(&self) -> Vec<StoredRelationship> {
        self.lock_state().relationships.clone()
    }

    pub fn sessions_opened(&self) -> usize {
        self.lock_state().sessions_opened
    }

    fn lock_state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn open(&self) -> Result<Box<dyn StoreSession>> {
        self.lock_state().sessions_opened += 1;
        Ok(Box::new(MemorySession {
            store: self.clone(),
        }))
    }
}

struct MemorySession {
    store: MemoryStore,
}

impl MemorySession {
    fn insert_sentence(state: &mut MemoryState, sentence: &str, document_id: i64) -> Result<i64> {
        if state
            .sentences
            .iter()
            .any(|s| s.sentence == sentence && s.document_id == document_id)
        {
            bail!("duplicate key value violates unique constraint \"sentences_sentences_document_id_key\"");
        }
        let id = state.sentences.len() as i64 + 1;
        state.sentences.push(StoredSentence {
            id,
            sentence: sentence.to_string(),
            document_id,
        });
        Ok(id)
    }
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn load_keywords(&mut self) -> Result<Vec<KeywordRecord>> {
        Ok(self.store.lock_state().keywords.clone())
    }

    async fn fetch_documents(&mut self, limit: i64, offset: i64) -> Result<Vec<Document>> {
        let state = self.store.lock_state();
        if state.failing_offsets.contains(&offset) {
            return Err(anyhow!("connection reset while fetching offset {offset}"));
        }
        let mut documents = state.documents.clone();
        documents.sort_by_key(|doc| doc.id);
        Ok(documents
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn write_results(&mut self, rows: &[ResultRow]) -> Result<WriteReport> {
        let mut report = WriteReport::default();
        let mut state = self.store.lock_state();
        if state.failing_writes {
            bail!("connection closed before writing {} rows", rows.len());
        }
        let mut sentence_ids = std::collections::HashMap::new();
        for group in unique_sentences(rows) {
            match Self::insert_sentence(&mut state, &group.sentence, group.document_id) {
                Ok(id) => {
                    sentence_ids.insert(group.sentence, id);
                    report.sentences_written += 1;
                }
                Err(err) => report.failures.push(RowError::Sentence {
                    document_id: group.document_id,
                    message: err.to_string(),
                }),
            }
        }
        for row in rows {
            let Some(&sentence_id) = sentence_ids.get(&row.sentence) else {
                report.failures.push(RowError::UnresolvedSentence {
                    document_id: row.document_id,
                    keyword_1: row.keyword_1.clone(),
                    keyword_2: row.keyword_2.clone(),
                });
                continue;
            };
            let id = state.relationships.len() as i64 + 1;
            state.relationships.push(StoredRelationship {
                id,
                document_id: row.document_id,
                sentence_id,
                keyword1: row.keyword_1.clone(),
                keyword2: row.keyword_2.clone(),
                category: category_label(row).to_string(),
            });
            report.relations_written += 1;
        }
        Ok(report)
    }
}
