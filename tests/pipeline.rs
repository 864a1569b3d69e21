use std::{fs, path::Path, sync::Arc};

use anyhow::anyhow;
use relation_miner::{
    data::{
        documents::Document,
        keywords::KeywordRecord,
        store::{DocumentStore, MemoryStore},
    },
    nlp::{
        relclf::{Category, LexicalClassifier},
        segment::Boundaries,
    },
    pipeline::{offset_plan, pool::WorkerPool, Orchestrator, RunOptions},
};

fn document(id: i64, name: &str, year: i32) -> Document {
    Document {
        id,
        file_location: format!("{name}.bib"),
        doi: Some(format!("10.1000/{id}")),
        year: Some(year),
        title: Some(format!("Paper {id}")),
        ..Default::default()
    }
}

struct Corpus {
    dir: tempfile::TempDir,
    store: MemoryStore,
}

impl Corpus {
    fn root(&self) -> String {
        format!("{}/", self.dir.path().display())
    }

    fn report(&self) -> std::path::PathBuf {
        self.dir.path().join("outputs").join("missing_txt_files.txt")
    }
}

/// Three documents: two readable, one without a text file.
fn corpus() -> Corpus {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "p1.txt", "Protein X increases Gene Y. Nothing else here.");
    write(
        dir.path(),
        "p3.txt",
        "Gene Y inhibits Protein X and Enzyme Z. Protein X increases Gene Y.",
    );
    let keywords = vec![
        KeywordRecord::named("Protein X"),
        KeywordRecord::named("Gene Y"),
        KeywordRecord::named("Enzyme Z"),
    ];
    let documents = vec![
        document(1, "p1", 2020),
        document(2, "p2", 2021),
        document(3, "p3", 2019),
    ];
    Corpus {
        dir,
        store: MemoryStore::new(keywords, documents),
    }
}

fn write(dir: &Path, name: &str, text: &str) {
    fs::write(dir.join(name), text).unwrap();
}

fn options(corpus: &Corpus) -> RunOptions {
    RunOptions {
        start_offset: 0,
        max_offset: 2,
        page_size: 1,
        batch_size: 2,
        dry_run: false,
        collect_results: true,
        missing_report: Some(corpus.report()),
    }
}

fn orchestrator(corpus: &Corpus, options: RunOptions) -> Orchestrator {
    Orchestrator::new(
        Arc::new(corpus.store.clone()),
        Arc::new(LexicalClassifier),
        WorkerPool::new(2),
        options,
        corpus.root(),
    )
    .with_boundaries(Boundaries::none())
}

#[test]
fn offsets_include_the_maximum() {
    assert_eq!(Vec::from(offset_plan(0, 25, 10).unwrap()), vec![0, 10, 20]);
    assert_eq!(Vec::from(offset_plan(0, 20, 10).unwrap()), vec![0, 10, 20]);
    assert_eq!(Vec::from(offset_plan(5, 5, 10).unwrap()), vec![5]);
    assert!(offset_plan(10, 5, 10).unwrap().is_empty());
    assert!(offset_plan(0, 5, 0).is_err());
    assert_eq!(offset_plan(i64::MAX - 1, i64::MAX, 10).unwrap().len(), 1);
}

#[tokio::test]
async fn pool_preserves_input_order() {
    let pool = WorkerPool::new(3);
    let outcomes = pool
        .run_all((0..10).collect(), |i: i64| async move {
            tokio::task::yield_now().await;
            Ok::<_, anyhow::Error>(i * 2)
        })
        .await;
    let values: Vec<i64> = outcomes.into_iter().map(|o| o.unwrap()).collect();
    assert_eq!(values, (0..10).map(|i| i * 2).collect::<Vec<_>>());
}

#[tokio::test]
async fn pool_contains_failures_and_panics() {
    let pool = WorkerPool::new(2);
    let outcomes = pool
        .run_all(vec![1, 2, 3, 4], |i: i32| async move {
            match i {
                2 => Err(anyhow!("job {i} failed")),
                3 => panic!("job {i} panicked"),
                _ => Ok(i),
            }
        })
        .await;
    assert_eq!(outcomes.len(), 4);
    assert_eq!(*outcomes[0].as_ref().unwrap(), 1);
    assert!(outcomes[1].is_err());
    assert!(outcomes[2].is_err());
    assert_eq!(*outcomes[3].as_ref().unwrap(), 4);
}

#[test]
fn pool_never_has_zero_workers() {
    assert_eq!(WorkerPool::new(0).workers(), 1);
    assert!(WorkerPool::for_host(usize::MAX).workers() >= 1);
}

#[tokio::test]
async fn end_to_end_run_persists_relations() {
    let corpus = corpus();
    let summary = orchestrator(&corpus, options(&corpus)).run().await.unwrap();

    assert_eq!(summary.iterations, 2);
    assert_eq!(summary.chunks_processed, 3);
    assert_eq!(summary.chunks_failed, 0);
    assert_eq!(summary.documents, 3);
    assert_eq!(summary.skipped_documents, 1);
    assert_eq!(summary.relations, 5);
    assert_eq!(summary.writes.error_count(), 0);

    let sentences = corpus.store.sentences();
    let texts: Vec<(&str, i64)> = sentences
        .iter()
        .map(|s| (s.sentence.as_str(), s.document_id))
        .collect();
    assert_eq!(sentences.len(), 3);
    assert!(texts.contains(&("Protein X increases Gene Y", 1)));
    assert!(texts.contains(&(" Protein X increases Gene Y", 3)));
    assert!(texts.contains(&("Gene Y inhibits Protein X and Enzyme Z", 3)));

    let relationships = corpus.store.relationships();
    assert_eq!(relationships.len(), 5);
    let first = relationships
        .iter()
        .find(|r| r.document_id == 1)
        .unwrap();
    assert_eq!(first.keyword1, "gene y");
    assert_eq!(first.keyword2, "protein x");
    assert_eq!(first.category, Category::PositiveImpact.as_str());
    assert!(relationships
        .iter()
        .filter(|r| r.document_id == 3 && r.keyword1 == "enzyme z")
        .all(|r| r.category == Category::NegativeImpact.as_str()));

    let report = fs::read_to_string(corpus.report()).unwrap();
    assert!(report.ends_with("p2.txt"));
    assert_eq!(summary.missing.len(), 1);

    assert_eq!(summary.results.len(), 5);
    assert!(summary.results.iter().all(|row| row.category.is_some()));
}

#[tokio::test]
async fn dry_run_leaves_store_untouched() {
    let corpus = corpus();
    let options = RunOptions {
        dry_run: true,
        ..options(&corpus)
    };
    let summary = orchestrator(&corpus, options).run().await.unwrap();

    assert_eq!(summary.relations, 5);
    assert_eq!(summary.results.len(), 5);
    assert!(corpus.store.sentences().is_empty());
    assert!(corpus.store.relationships().is_empty());
}

#[tokio::test]
async fn failing_chunk_does_not_stop_the_run() {
    let corpus = corpus();
    corpus.store.fail_offset(0);
    let summary = orchestrator(&corpus, options(&corpus)).run().await.unwrap();

    assert_eq!(summary.chunks_failed, 1);
    assert_eq!(summary.chunks_processed, 2);
    assert!(corpus
        .store
        .relationships()
        .iter()
        .all(|r| r.document_id == 3));
    assert_eq!(corpus.store.relationships().len(), 4);
}

#[tokio::test]
async fn failed_write_is_not_counted_as_processed() {
    let corpus = corpus();
    corpus.store.fail_writes();
    let summary = orchestrator(&corpus, options(&corpus)).run().await.unwrap();

    // offsets 0 and 2 carry rows and fail to persist; offset 1 has nothing to write
    assert_eq!(summary.chunks_failed, 2);
    assert_eq!(summary.chunks_processed, 1);
    assert_eq!(summary.chunks_failed + summary.chunks_processed, 3);
    assert_eq!(summary.writes.relations_written, 0);
    assert!(corpus.store.relationships().is_empty());
}

#[tokio::test]
async fn dry_run_counts_every_extracted_chunk() {
    let corpus = corpus();
    corpus.store.fail_writes();
    let options = RunOptions {
        dry_run: true,
        ..options(&corpus)
    };
    let summary = orchestrator(&corpus, options).run().await.unwrap();
    assert_eq!(summary.chunks_processed, 3);
    assert_eq!(summary.chunks_failed, 0);
}

#[tokio::test]
async fn duplicate_sentence_is_reported_per_row() {
    let corpus = corpus();
    let options = RunOptions {
        max_offset: 0,
        ..options(&corpus)
    };
    orchestrator(&corpus, options.clone()).run().await.unwrap();
    let rerun = orchestrator(&corpus, options).run().await.unwrap();

    assert_eq!(corpus.store.sentences().len(), 1);
    assert_eq!(rerun.writes.sentences_written, 0);
    assert_eq!(rerun.writes.relations_written, 0);
    assert_eq!(rerun.writes.error_count(), 2);
}

#[tokio::test]
async fn sessions_are_opened_per_worker_job() {
    let corpus = corpus();
    orchestrator(&corpus, options(&corpus)).run().await.unwrap();
    // keywords + three fetches + two non-empty writes
    assert_eq!(corpus.store.sessions_opened(), 6);

    let mut session = corpus.store.open().await.unwrap();
    let page = session.fetch_documents(2, 1).await.unwrap();
    assert_eq!(page.iter().map(|d| d.id).collect::<Vec<_>>(), vec![2, 3]);
}
