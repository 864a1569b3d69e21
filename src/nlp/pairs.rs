//! Keyword co-occurrence detection and pairwise candidate generation.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    data::{documents::Document, keywords::KeywordSet},
    nlp::segment::{self, Boundaries, MissingFiles},
    error::DocumentError,
};

/// Compiled automata for large vocabularies easily exceed the regex default.
const MATCHER_SIZE_LIMIT: usize = 256 * (1 << 20);

/// Unordered keyword pair found in one sentence. `keyword_1 <= keyword_2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeywordPair {
    pub document_id: i64,
    /// Resolved text path the sentence came from.
    pub paper: PathBuf,
    pub keyword_1: String,
    pub keyword_2: String,
    pub sentence: String,
    /// Keyword occurrences matched in the sentence, repeats included.
    pub match_count: usize,
}

/// Whole-word, case-insensitive matcher over the full vocabulary.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    pattern: Option<Regex>,
}

impl KeywordMatcher {
    /// Build once per run. Longer keywords are tried first so overlapping
    /// entries resolve to the most specific surface form.
    pub fn new(keywords: &KeywordSet) -> Result<Self> {
        let mut names: Vec<&str> = keywords.names().collect();
        if names.is_empty() {
            return Ok(Self { pattern: None });
        }
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternation = names
            .iter()
            .map(|name| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
            .case_insensitive(true)
            .size_limit(MATCHER_SIZE_LIMIT)
            .dfa_size_limit(MATCHER_SIZE_LIMIT)
            .build()
            .context("compiling keyword matcher")?;
        debug!(keywords = names.len(), "compiled keyword matcher");
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// Canonical (lowercase) keyword for every match, in order, repeats included.
    pub fn find_all(&self, sentence: &str) -> Vec<String> {
        let Some(pattern) = &self.pattern else {
            return Vec::new();
        };
        let lower = sentence.to_lowercase();
        pattern
            .find_iter(&lower)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

/// `(pair, sentence)` combinations already emitted. One tracker spans a whole
/// page, so a sentence repeated across documents yields its pairs once.
#[derive(Debug, Default)]
pub struct EmittedPairs {
    seen: HashMap<(String, String), HashSet<String>>,
}

impl EmittedPairs {
    /// Record the combination; `false` if it was already emitted.
    fn insert(&mut self, pair: &(String, String), sentence: &str) -> bool {
        let sentences = self.seen.entry(pair.clone()).or_default();
        if sentences.contains(sentence) {
            return false;
        }
        sentences.insert(sentence.to_string())
    }

    /// Distinct `(pair, sentence)` combinations recorded so far.
    pub fn len(&self) -> usize {
        self.seen.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Emits keyword pairs document by document, suppressing combinations the
/// shared tracker has already seen.
#[derive(Debug)]
pub struct PairExtractor<'a> {
    matcher: &'a KeywordMatcher,
}

impl<'a> PairExtractor<'a> {
    pub fn new(matcher: &'a KeywordMatcher) -> Self {
        Self { matcher }
    }

    pub fn extract_document(
        &self,
        emitted: &mut EmittedPairs,
        document: &Document,
        paper: &Path,
        sentences: &[String],
    ) -> Vec<KeywordPair> {
        let mut pairs = Vec::new();
        for sentence in sentences {
            let matches = self.matcher.find_all(sentence);
            if matches.len() < 2 {
                continue;
            }
            for i in 0..matches.len() {
                for j in (i + 1)..matches.len() {
                    let (a, b) = (&matches[i], &matches[j]);
                    if a == b {
                        continue;
                    }
                    let key = if a <= b {
                        (a.clone(), b.clone())
                    } else {
                        (b.clone(), a.clone())
                    };
                    if !emitted.insert(&key, sentence) {
                        continue;
                    }
                    pairs.push(KeywordPair {
                        document_id: document.id,
                        paper: paper.to_path_buf(),
                        keyword_1: key.0,
                        keyword_2: key.1,
                        sentence: sentence.clone(),
                        match_count: matches.len(),
                    });
                }
            }
        }
        pairs
    }
}

/// Outcome of extracting a page of documents.
#[derive(Debug, Default)]
pub struct Extraction {
    pub pairs: Vec<KeywordPair>,
    pub missing: MissingFiles,
    /// Documents skipped for any reason (missing or unreadable).
    pub skipped: usize,
}

/// Segment and scan every document of a page. A document that cannot be read
/// is logged and skipped; it never aborts the page.
pub fn extract_pairs(
    documents: &[Document],
    documents_root: &str,
    boundaries: &Boundaries,
    matcher: &KeywordMatcher,
) -> Extraction {
    let extractor = PairExtractor::new(matcher);
    let mut emitted = EmittedPairs::default();
    let mut extraction = Extraction::default();
    for document in documents {
        let paper = document.text_path(documents_root);
        match segment::read_document(&paper, boundaries) {
            Ok(sentences) => {
                let found = extractor.extract_document(&mut emitted, document, &paper, &sentences);
                debug!(document_id = document.id, pairs = found.len(), "scanned document");
                extraction.pairs.extend(found);
            }
            Err(err) => {
                extraction.skipped += 1;
                if let DocumentError::Missing(path) = &err {
                    extraction.missing.record(path.clone());
                } else {
                    warn!(document_id = document.id, path = %err.path().display(), error = %err, "skipping unreadable document");
                }
            }
        }
    }
    extraction
}
