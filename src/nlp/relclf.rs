//! Relation classification: fixed label set, batching, and classifier loading.

use std::{fmt, str::FromStr, sync::Arc};

use anyhow::{bail, ensure, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ModelSettings;

/// Closed label set produced by the relation classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    NegativeImpact,
    NoImpact,
    PositiveImpact,
    NoInfoAboutRelation,
}

impl Category {
    /// Labels in model output order.
    pub const ALL: [Category; 4] = [
        Category::NegativeImpact,
        Category::NoImpact,
        Category::PositiveImpact,
        Category::NoInfoAboutRelation,
    ];

    /// Map a model output index onto its label.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NegativeImpact => "NEGATIVE_IMPACT",
            Self::NoImpact => "NO_IMPACT",
            Self::PositiveImpact => "POSITIVE_IMPACT",
            Self::NoInfoAboutRelation => "NO_INFO_ABOUT_RELATION",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().replace(' ', "_").to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == key)
            .ok_or_else(|| anyhow::anyhow!("unknown category {s:?}"))
    }
}

/// Text classifier over a fixed label set. One `predict` call is one inference call
/// and must return exactly one label per input, in input order.
pub trait RelationClassifier: Send + Sync {
    fn predict(&self, texts: &[String]) -> Result<Vec<Category>>;

    fn name(&self) -> &'static str;
}

/// Classifier input for a pair: sentence and both keywords joined with periods.
pub fn compose_input(sentence: &str, keyword_1: &str, keyword_2: &str) -> String {
    format!("{sentence}.{keyword_1}.{keyword_2}")
}

/// Run `inputs` through the classifier in consecutive chunks of at most `batch_size`.
pub fn classify_in_batches(
    classifier: &dyn RelationClassifier,
    inputs: &[String],
    batch_size: usize,
) -> Result<Vec<Category>> {
    ensure!(batch_size > 0, "batch size must be positive");
    let mut labels = Vec::with_capacity(inputs.len());
    for (idx, batch) in inputs.chunks(batch_size).enumerate() {
        let predicted = classifier.predict(batch)?;
        if predicted.len() != batch.len() {
            bail!(
                "{} returned {} labels for batch {idx} of {} inputs",
                classifier.name(),
                predicted.len(),
                batch.len()
            );
        }
        labels.extend(predicted);
    }
    debug!(
        classifier = classifier.name(),
        inputs = inputs.len(),
        batch_size,
        "classified inputs"
    );
    Ok(labels)
}

const POSITIVE_CUES: &[&str] = &[
    "increase",
    "increased",
    "increases",
    "improve",
    "improved",
    "improves",
    "enhance",
    "enhanced",
    "enhances",
    "promote",
    "promotes",
    "stimulate",
    "stimulates",
    "upregulate",
    "upregulates",
    "activates",
    "induces",
    "boosts",
];

const NEGATIVE_CUES: &[&str] = &[
    "decrease",
    "decreased",
    "decreases",
    "reduce",
    "reduced",
    "reduces",
    "inhibit",
    "inhibits",
    "inhibited",
    "suppress",
    "suppresses",
    "impair",
    "impairs",
    "damage",
    "damages",
    "downregulate",
    "downregulates",
    "toxic",
];

const NEUTRAL_CUES: &[&str] = &[
    "no effect",
    "no significant",
    "not affect",
    "did not",
    "does not",
    "unaffected",
    "no difference",
    "no change",
];

/// Deterministic cue-word classifier used when no ONNX model is compiled in.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalClassifier;

impl LexicalClassifier {
    fn label(text: &str) -> Category {
        let lower = text.to_lowercase();
        if NEUTRAL_CUES.iter().any(|cue| lower.contains(cue)) {
            return Category::NoImpact;
        }
        let tokens: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .collect();
        let positive = tokens.iter().filter(|t| POSITIVE_CUES.contains(*t)).count();
        let negative = tokens.iter().filter(|t| NEGATIVE_CUES.contains(*t)).count();
        match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => Category::PositiveImpact,
            std::cmp::Ordering::Less => Category::NegativeImpact,
            std::cmp::Ordering::Equal => Category::NoInfoAboutRelation,
        }
    }
}

impl RelationClassifier for LexicalClassifier {
    fn predict(&self, texts: &[String]) -> Result<Vec<Category>> {
        Ok(texts.iter().map(|text| Self::label(text)).collect())
    }

    fn name(&self) -> &'static str {
        "lexical"
    }
}

/// Load the process-wide classifier once, before any batch is processed.
#[cfg(feature = "onx")]
pub fn load_classifier(settings: &ModelSettings) -> Result<Arc<dyn RelationClassifier>> {
    let classifier = crate::nlp::bert::BertClassifier::load(
        &settings.model_path,
        settings.max_seq_length,
    )?;
    info!(model = %settings.model_path.display(), "loaded BERT relation classifier");
    Ok(Arc::new(classifier) as Arc<dyn RelationClassifier>)
}

/// Load the process-wide classifier once, before any batch is processed.
#[cfg(not(feature = "onx"))]
pub fn load_classifier(settings: &ModelSettings) -> Result<Arc<dyn RelationClassifier>> {
    warn!(
        model = %settings.model_path.display(),
        "built without `onx`; falling back to the lexical classifier"
    );
    info!(classifier = "lexical", "relation classifier ready");
    Ok(Arc::new(LexicalClassifier) as Arc<dyn RelationClassifier>)
}
