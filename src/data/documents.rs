//! Bibliographic document rows and text-path resolution.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One row of `<schema>.documents`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Document {
    pub id: i64,
    /// Path of the bibliography entry relative to the documents root.
    pub file_location: String,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub year: Option<i32>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub journal: Option<String>,
}

impl Document {
    /// Absolute bibliography path under `root`, separators adjusted for the host.
    pub fn bib_path(&self, root: &str) -> String {
        host_separators(&format!("{root}{}", self.file_location))
    }

    /// Plain-text sibling of the bibliography entry (`.bib` → `.txt`).
    pub fn text_path(&self, root: &str) -> PathBuf {
        PathBuf::from(self.bib_path(root).replace(".bib", ".txt"))
    }
}

/// Lenient year parsing for loosely typed bibliography imports (`"2019"`, `"2019.0"`, `" 2019 "`).
pub fn parse_year(raw: Option<&str>) -> Option<i32> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<i32>()
        .ok()
        .or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(|value| value as i32)
        })
}

#[cfg(windows)]
fn host_separators(path: &str) -> String {
    path.replace('/', "\\")
}

#[cfg(not(windows))]
fn host_separators(path: &str) -> String {
    path.replace('\\', "/")
}
