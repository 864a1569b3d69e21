use std::{
    str::FromStr,
    sync::atomic::{AtomicUsize, Ordering},
};

use anyhow::Result;
use proptest::prelude::*;
use relation_miner::nlp::relclf::{
    self, Category, LexicalClassifier, RelationClassifier,
};

/// Deterministic stand-in that records every inference call.
#[derive(Default)]
struct CountingClassifier {
    calls: AtomicUsize,
    largest_batch: AtomicUsize,
}

impl RelationClassifier for CountingClassifier {
    fn predict(&self, texts: &[String]) -> Result<Vec<Category>> {
        assert!(!texts.is_empty(), "empty batch");
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.largest_batch.fetch_max(texts.len(), Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|text| Category::ALL[text.len() % Category::ALL.len()])
            .collect())
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

struct ShortClassifier;

impl RelationClassifier for ShortClassifier {
    fn predict(&self, texts: &[String]) -> Result<Vec<Category>> {
        Ok(vec![Category::NoImpact; texts.len().saturating_sub(1)])
    }

    fn name(&self) -> &'static str {
        "short"
    }
}

#[test]
fn batch_size_controls_call_count_not_labels() {
    let inputs = vec!["a.b.c".to_string(), "d.e.f".to_string()];

    let single = CountingClassifier::default();
    let by_one = relclf::classify_in_batches(&single, &inputs, 1).unwrap();
    assert_eq!(single.calls.load(Ordering::SeqCst), 2);

    let pair = CountingClassifier::default();
    let by_two = relclf::classify_in_batches(&pair, &inputs, 2).unwrap();
    assert_eq!(pair.calls.load(Ordering::SeqCst), 1);

    assert_eq!(by_one, by_two);
    assert_eq!(by_one.len(), 2);
}

#[test]
fn empty_input_issues_no_calls() {
    let classifier = CountingClassifier::default();
    let labels = relclf::classify_in_batches(&classifier, &[], 4).unwrap();
    assert!(labels.is_empty());
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn zero_batch_size_is_rejected() {
    let classifier = CountingClassifier::default();
    assert!(relclf::classify_in_batches(&classifier, &["x".to_string()], 0).is_err());
}

#[test]
fn label_count_mismatch_is_an_error() {
    let inputs = vec!["one".to_string(), "two".to_string()];
    let err = relclf::classify_in_batches(&ShortClassifier, &inputs, 2).unwrap_err();
    assert!(err.to_string().contains("short returned 1 labels"));
}

#[test]
fn composed_input_joins_with_periods() {
    assert_eq!(
        relclf::compose_input("Protein X regulates Gene Y", "gene y", "protein x"),
        "Protein X regulates Gene Y.gene y.protein x"
    );
}

#[test]
fn category_labels_round_trip() {
    for category in Category::ALL {
        assert_eq!(Category::from_str(category.as_str()).unwrap(), category);
    }
    assert_eq!(
        Category::from_str("no info about relation").unwrap(),
        Category::NoInfoAboutRelation
    );
    assert_eq!(Category::from_index(2), Some(Category::PositiveImpact));
    assert_eq!(Category::from_index(4), None);
    assert!(Category::from_str("MAYBE").is_err());
}

#[test]
fn lexical_classifier_reads_cue_words() {
    let texts = vec![
        "Drug A increases survival.drug a.survival".to_string(),
        "Drug A inhibits growth.drug a.growth".to_string(),
        "Drug A did not alter growth.drug a.growth".to_string(),
        "Drug A and growth.drug a.growth".to_string(),
    ];
    assert_eq!(
        LexicalClassifier.predict(&texts).unwrap(),
        vec![
            Category::PositiveImpact,
            Category::NegativeImpact,
            Category::NoImpact,
            Category::NoInfoAboutRelation,
        ]
    );
}

proptest! {
    #[test]
    fn calls_equal_ceiling_of_inputs_over_batch(count in 0usize..200, batch in 1usize..64) {
        let inputs: Vec<String> = (0..count).map(|i| format!("s{i}.a.b")).collect();
        let classifier = CountingClassifier::default();
        let labels = relclf::classify_in_batches(&classifier, &inputs, batch).unwrap();
        prop_assert_eq!(labels.len(), count);
        prop_assert_eq!(classifier.calls.load(Ordering::SeqCst), count.div_ceil(batch));
        prop_assert!(classifier.largest_batch.load(Ordering::SeqCst) <= batch);
    }
}
