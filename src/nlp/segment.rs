//! Sentence segmentation of extracted article text.

use std::{
    collections::BTreeSet,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::error::DocumentError;

/// Markers delimiting the article body. Text up to the first `before` marker and
/// from the first subsequent `after` marker onward is discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundaries {
    pub before: Vec<String>,
    pub after: Vec<String>,
}

impl Boundaries {
    pub fn new<B, A, S>(before: B, after: A) -> Self
    where
        B: IntoIterator<Item = S>,
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            before: before.into_iter().map(Into::into).collect(),
            after: after.into_iter().map(Into::into).collect(),
        }
    }

    /// No trimming at all.
    pub fn none() -> Self {
        Self {
            before: Vec::new(),
            after: Vec::new(),
        }
    }
}

impl Default for Boundaries {
    fn default() -> Self {
        Self::new(
            ["Abstract", "ABS T R AC T", "ABSTRACT"],
            ["References", "REFERENCES", "Abbreviations", "ABBREVIATIONS"],
        )
    }
}

/// Earliest occurrence of any marker; the longer marker wins a tie.
fn earliest<'m>(text: &str, markers: &'m [String]) -> Option<(usize, &'m str)> {
    markers
        .iter()
        .filter(|marker| !marker.is_empty())
        .filter_map(|marker| text.find(marker.as_str()).map(|pos| (pos, marker.as_str())))
        .min_by(|(a_pos, a), (b_pos, b)| a_pos.cmp(b_pos).then(b.len().cmp(&a.len())))
}

/// Cut the header before the body marker and the back matter after it.
pub fn trim_to_body<'t>(text: &'t str, boundaries: &Boundaries) -> &'t str {
    let body = match earliest(text, &boundaries.before) {
        Some((pos, marker)) => &text[pos + marker.len()..],
        None => text,
    };
    match earliest(body, &boundaries.after) {
        Some((pos, _)) => &body[..pos],
        None => body,
    }
}

/// Split into paragraphs on blank lines, then into sentence units on periods.
/// Empty fragments are kept.
pub fn split_sentences(text: &str) -> Vec<String> {
    text.split("\n\n")
        .flat_map(|paragraph| {
            paragraph
                .replace('\n', " ")
                .split('.')
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Read a document, trim it to the body and segment it. The file is never modified.
pub fn read_document(path: &Path, boundaries: &Boundaries) -> Result<Vec<String>, DocumentError> {
    let bytes = fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => DocumentError::Missing(path.to_path_buf()),
        _ => DocumentError::Read {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(split_sentences(trim_to_body(&text, boundaries)))
}

/// Document paths that could not be located, in first-seen order without repeats.
#[derive(Debug, Clone, Default)]
pub struct MissingFiles {
    seen: BTreeSet<PathBuf>,
    ordered: Vec<PathBuf>,
}

impl MissingFiles {
    pub fn record(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if self.insert(path.clone()) {
            warn!(path = %path.display(), "couldn't find document text");
        }
    }

    /// Merge paths already reported elsewhere, without logging them again.
    pub fn extend<I: IntoIterator<Item = PathBuf>>(&mut self, paths: I) {
        for path in paths {
            self.insert(path);
        }
    }

    fn insert(&mut self, path: PathBuf) -> bool {
        if !self.seen.insert(path.clone()) {
            return false;
        }
        self.ordered.push(path);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.ordered
    }

    /// Overwrite `report` with one path per line. Does nothing when nothing is missing.
    pub fn write_report(&self, report: &Path) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        if let Some(parent) = report.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = self
            .ordered
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        fs::write(report, body).with_context(|| format!("write {}", report.display()))?;
        info!(path = %report.display(), count = self.len(), "wrote missing files report");
        Ok(())
    }
}
