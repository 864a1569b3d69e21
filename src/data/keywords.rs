//! Keyword vocabulary normalisation and taxonomy lookup.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Raw keyword row as stored in `<schema>.keywords`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KeywordRecord {
    pub name: String,
    pub normalized_term: Option<String>,
    pub general_term: Option<String>,
    pub displayed_term: Option<String>,
}

impl KeywordRecord {
    /// Bare keyword without taxonomy attributes.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Keyword mapped onto a normalized taxonomy term.
    pub fn with_normalized(name: impl Into<String>, normalized: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            normalized_term: Some(normalized.into()),
            ..Default::default()
        }
    }
}

/// Taxonomy attributes carried alongside one side of a keyword pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermInfo {
    pub normalized_term: Option<String>,
    pub general_term: Option<String>,
    pub displayed_term: Option<String>,
}

/// Canonical vocabulary entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    pub name: String,
    pub terms: TermInfo,
}

/// Cleaned, deduplicated keyword vocabulary keyed by canonical name.
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    entries: IndexMap<String, Keyword>,
}

impl KeywordSet {
    /// Trim and lowercase every name, keeping the first record seen for each.
    pub fn normalize<I>(records: I) -> Self
    where
        I: IntoIterator<Item = KeywordRecord>,
    {
        let mut entries = IndexMap::new();
        let mut raw = 0usize;
        for record in records {
            raw += 1;
            let name = record.name.trim().to_lowercase();
            if name.is_empty() || entries.contains_key(&name) {
                continue;
            }
            let keyword = Keyword {
                name: name.clone(),
                terms: TermInfo {
                    normalized_term: clean(record.normalized_term),
                    general_term: clean(record.general_term),
                    displayed_term: clean(record.displayed_term),
                },
            };
            entries.insert(name, keyword);
        }
        info!(raw, unique = entries.len(), "normalised keyword vocabulary");
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Keyword> {
        self.entries.get(name)
    }

    /// Canonical names in first-seen order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Taxonomy attributes for `name`; empty when the keyword is unknown.
    pub fn terms(&self, name: &str) -> TermInfo {
        self.get(name)
            .map(|keyword| keyword.terms.clone())
            .unwrap_or_default()
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_record_wins_after_normalisation() {
        let set = KeywordSet::normalize(vec![
            KeywordRecord::with_normalized("  Gene Y ", "gene-y"),
            KeywordRecord::with_normalized("gene y", "other"),
            KeywordRecord::named(""),
            KeywordRecord::named("Protein X"),
        ]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["gene y", "protein x"]);
        assert_eq!(
            set.terms("gene y").normalized_term.as_deref(),
            Some("gene-y")
        );
        assert_eq!(set.terms("missing"), TermInfo::default());
    }
}
