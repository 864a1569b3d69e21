//! Offset-paged orchestration of extraction, classification and persistence.

pub mod merge;
pub mod pool;

use std::{collections::VecDeque, path::PathBuf, sync::Arc, time::Instant};

use anyhow::{ensure, Context, Result};
use tracing::{error, info, warn};

use crate::{
    data::{
        documents::Document,
        keywords::KeywordSet,
        store::{DocumentStore, WriteReport},
    },
    nlp::{
        self,
        pairs::KeywordMatcher,
        relclf::{self, RelationClassifier},
        segment::{Boundaries, MissingFiles},
    },
};
use merge::{merge_results, sort_results, ResultRow};
use pool::WorkerPool;

/// Offsets `start, start + page_size, ...` up to and including `max`.
pub fn offset_plan(start: i64, max: i64, page_size: i64) -> Result<VecDeque<i64>> {
    ensure!(page_size > 0, "page size must be positive, got {page_size}");
    let mut plan = VecDeque::new();
    let mut cursor = Some(start);
    while let Some(offset) = cursor.filter(|offset| *offset <= max) {
        plan.push_back(offset);
        cursor = offset.checked_add(page_size);
    }
    Ok(plan)
}

/// Knobs for a single run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub start_offset: i64,
    pub max_offset: i64,
    pub page_size: i64,
    pub batch_size: usize,
    /// Skip the persistence phase entirely.
    pub dry_run: bool,
    /// Keep every classified row in the summary (for export).
    pub collect_results: bool,
    /// Where to write the list of documents whose text could not be found.
    pub missing_report: Option<PathBuf>,
}

/// Read-only state shared by every extraction worker.
#[derive(Debug)]
pub struct ExtractionContext {
    pub documents_root: String,
    pub boundaries: Boundaries,
    pub keywords: KeywordSet,
    pub matcher: KeywordMatcher,
}

impl ExtractionContext {
    pub fn new(documents_root: String, boundaries: Boundaries, keywords: KeywordSet) -> Result<Self> {
        let matcher = KeywordMatcher::new(&keywords)?;
        Ok(Self {
            documents_root,
            boundaries,
            keywords,
            matcher,
        })
    }

    /// Extraction, taxonomy merge, metadata merge and sort for one page.
    pub fn process(&self, offset: i64, documents: &[Document]) -> ChunkOutput {
        let page = nlp::extract_relations(
            documents,
            &self.documents_root,
            &self.boundaries,
            &self.matcher,
            &self.keywords,
        );
        let mut rows = merge_results(&page.relations, documents);
        sort_results(&mut rows);
        ChunkOutput {
            offset,
            documents: documents.len(),
            skipped: page.skipped,
            rows,
            missing: page.missing,
        }
    }
}

/// Rows produced for one offset window.
#[derive(Debug, Default)]
pub struct ChunkOutput {
    pub offset: i64,
    pub documents: usize,
    pub skipped: usize,
    pub rows: Vec<ResultRow>,
    pub missing: MissingFiles,
}

/// Aggregate counters for a whole run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub iterations: usize,
    pub chunks_processed: usize,
    pub chunks_failed: usize,
    pub documents: usize,
    pub skipped_documents: usize,
    pub relations: usize,
    pub writes: WriteReport,
    pub missing: MissingFiles,
    pub results: Vec<ResultRow>,
}

/// Label every row of a chunk with the shared classifier.
pub fn classify_rows(
    classifier: &dyn RelationClassifier,
    rows: &mut [ResultRow],
    batch_size: usize,
) -> Result<()> {
    let inputs: Vec<String> = rows
        .iter()
        .map(|row| relclf::compose_input(&row.sentence, &row.keyword_1, &row.keyword_2))
        .collect();
    let labels = relclf::classify_in_batches(classifier, &inputs, batch_size)?;
    for (row, label) in rows.iter_mut().zip(labels) {
        row.category = Some(label);
    }
    Ok(())
}

/// Drives the offset loop: parallel extraction, sequential classification,
/// parallel persistence, with a barrier between phases.
pub struct Orchestrator {
    store: Arc<dyn DocumentStore>,
    classifier: Arc<dyn RelationClassifier>,
    pool: WorkerPool,
    options: RunOptions,
    documents_root: String,
    boundaries: Boundaries,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        classifier: Arc<dyn RelationClassifier>,
        pool: WorkerPool,
        options: RunOptions,
        documents_root: impl Into<String>,
    ) -> Self {
        Self {
            store,
            classifier,
            pool,
            options,
            documents_root: documents_root.into(),
            boundaries: Boundaries::default(),
        }
    }

    pub fn with_boundaries(mut self, boundaries: Boundaries) -> Self {
        self.boundaries = boundaries;
        self
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let keywords = {
            let mut session = self
                .store
                .open()
                .await
                .context("opening session for keyword vocabulary")?;
            KeywordSet::normalize(session.load_keywords().await?)
        };
        if keywords.is_empty() {
            warn!("keyword vocabulary is empty; no relations can be extracted");
        }
        let context = Arc::new(ExtractionContext::new(
            self.documents_root.clone(),
            self.boundaries.clone(),
            keywords,
        )?);

        let mut offsets = offset_plan(
            self.options.start_offset,
            self.options.max_offset,
            self.options.page_size,
        )?;
        info!(
            windows = offsets.len(),
            workers = self.pool.workers(),
            classifier = self.classifier.name(),
            "starting offset loop"
        );

        let mut summary = RunSummary::default();
        while !offsets.is_empty() {
            let take = self.pool.workers().min(offsets.len());
            let selected: Vec<i64> = offsets.drain(..take).collect();
            summary.iterations += 1;

            let mut chunks = self.extract_phase(&context, &selected, &mut summary).await;
            self.classify_phase(&mut chunks, &mut summary).await;
            self.persist_phase(chunks, &mut summary).await;

            if let Some(report) = &self.options.missing_report {
                if let Err(err) = summary.missing.write_report(report) {
                    warn!(error = %err, "could not write missing files report");
                }
            }
            info!(
                max_offset = selected.iter().max().copied().unwrap_or_default(),
                "iteration complete"
            );
        }

        info!(
            iterations = summary.iterations,
            chunks = summary.chunks_processed,
            failed_chunks = summary.chunks_failed,
            documents = summary.documents,
            skipped = summary.skipped_documents,
            relations = summary.relations,
            sentences_written = summary.writes.sentences_written,
            relations_written = summary.writes.relations_written,
            row_errors = summary.writes.error_count(),
            missing = summary.missing.len(),
            "run complete"
        );
        Ok(summary)
    }

    async fn extract_phase(
        &self,
        context: &Arc<ExtractionContext>,
        selected: &[i64],
        summary: &mut RunSummary,
    ) -> Vec<ChunkOutput> {
        let started = Instant::now();
        let page_size = self.options.page_size;
        let outcomes = self
            .pool
            .run_all(selected.to_vec(), |offset| {
                let store = Arc::clone(&self.store);
                let context = Arc::clone(context);
                async move { extract_chunk(store, context, offset, page_size).await }
            })
            .await;

        let mut chunks = Vec::with_capacity(outcomes.len());
        for (offset, outcome) in selected.iter().zip(outcomes) {
            match outcome {
                Ok(chunk) => {
                    summary.documents += chunk.documents;
                    summary.skipped_documents += chunk.skipped;
                    summary.missing.extend(chunk.missing.paths().iter().cloned());
                    chunks.push(chunk);
                }
                Err(err) => {
                    summary.chunks_failed += 1;
                    let message = format!("{err:#}");
                    error!(offset, error = %message, "extraction failed; chunk dropped");
                }
            }
        }
        let span = selected.iter().max().copied().unwrap_or_default()
            - selected.iter().min().copied().unwrap_or_default()
            + page_size;
        info!(
            offset_span = span,
            chunks = chunks.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "extraction phase complete"
        );
        chunks
    }

    async fn classify_phase(&self, chunks: &mut Vec<ChunkOutput>, summary: &mut RunSummary) {
        let started = Instant::now();
        let batch_size = self.options.batch_size;
        let mut classified = Vec::with_capacity(chunks.len());
        for mut chunk in chunks.drain(..) {
            let classifier = Arc::clone(&self.classifier);
            let mut rows = std::mem::take(&mut chunk.rows);
            let outcome = tokio::task::spawn_blocking(move || {
                classify_rows(classifier.as_ref(), &mut rows, batch_size).map(|()| rows)
            })
            .await;
            match outcome {
                Ok(Ok(rows)) => {
                    chunk.rows = rows;
                    classified.push(chunk);
                }
                Ok(Err(err)) => {
                    summary.chunks_failed += 1;
                    let message = format!("{err:#}");
                    error!(offset = chunk.offset, error = %message, "classification failed; chunk dropped");
                }
                Err(err) => {
                    summary.chunks_failed += 1;
                    error!(offset = chunk.offset, error = %err, "classification task aborted; chunk dropped");
                }
            }
        }
        *chunks = classified;
        info!(
            chunks = chunks.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "classification phase complete"
        );
    }

    async fn persist_phase(&self, chunks: Vec<ChunkOutput>, summary: &mut RunSummary) {
        let started = Instant::now();
        let batches: Vec<(i64, Arc<Vec<ResultRow>>)> = chunks
            .into_iter()
            .map(|chunk| (chunk.offset, Arc::new(chunk.rows)))
            .collect();

        for (_, rows) in &batches {
            summary.relations += rows.len();
        }

        if self.options.dry_run {
            summary.chunks_processed += batches.len();
        } else {
            let (pending, empty): (Vec<_>, Vec<_>) =
                batches.iter().cloned().partition(|(_, rows)| !rows.is_empty());
            summary.chunks_processed += empty.len();
            let offsets: Vec<i64> = pending.iter().map(|(offset, _)| *offset).collect();
            let outcomes = self
                .pool
                .run_all(pending, |(_, rows)| {
                    let store = Arc::clone(&self.store);
                    async move {
                        let mut session = store.open().await.context("opening write session")?;
                        session.write_results(&rows).await
                    }
                })
                .await;
            for (offset, outcome) in offsets.into_iter().zip(outcomes) {
                match outcome {
                    Ok(report) => {
                        summary.chunks_processed += 1;
                        summary.writes.merge(report);
                    }
                    Err(err) => {
                        summary.chunks_failed += 1;
                        let message = format!("{err:#}");
                        error!(offset, error = %message, "persistence failed for chunk");
                    }
                }
            }
        }

        if self.options.collect_results {
            for (_, rows) in batches {
                let rows = Arc::try_unwrap(rows).unwrap_or_else(|shared| (*shared).clone());
                summary.results.extend(rows);
            }
        }
        info!(
            dry_run = self.options.dry_run,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "persistence phase complete"
        );
    }
}

async fn extract_chunk(
    store: Arc<dyn DocumentStore>,
    context: Arc<ExtractionContext>,
    offset: i64,
    limit: i64,
) -> Result<ChunkOutput> {
    let documents = {
        let mut session = store
            .open()
            .await
            .with_context(|| format!("opening session for offset {offset}"))?;
        session.fetch_documents(limit, offset).await?
    };
    tokio::task::spawn_blocking(move || context.process(offset, &documents))
        .await
        .with_context(|| format!("extraction task for offset {offset} aborted"))
}
