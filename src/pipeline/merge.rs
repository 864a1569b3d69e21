//! Joins classified relations with bibliographic metadata and orders the output.

use std::{cmp::Ordering, collections::HashMap};

use serde::{Deserialize, Serialize};

use crate::{
    data::documents::Document,
    nlp::{relclf::Category, taxonomy::Relation},
};

/// Output record: one relation in one sentence, with its document's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub document_id: i64,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub year: Option<i32>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub journal: Option<String>,
    pub keyword_1: String,
    pub general_term_x: Option<String>,
    pub displayed_term_x: Option<String>,
    pub keyword_2: String,
    pub general_term_y: Option<String>,
    pub displayed_term_y: Option<String>,
    pub sentence: String,
    pub category: Option<Category>,
}

/// File name without directory or final extension. Accepts either separator.
pub fn filename_stem(path_like: &str) -> &str {
    let name = path_like
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(path_like);
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

/// Inner join on filename stems. Relations without a matching document are dropped;
/// a stem shared by several documents yields one row per document.
pub fn merge_results(relations: &[Relation], documents: &[Document]) -> Vec<ResultRow> {
    let mut by_stem: HashMap<&str, Vec<&Document>> = HashMap::new();
    for document in documents {
        by_stem
            .entry(filename_stem(&document.file_location))
            .or_default()
            .push(document);
    }

    let mut rows = Vec::new();
    for relation in relations {
        let paper = relation.pair.paper.to_string_lossy();
        let Some(matches) = by_stem.get(filename_stem(&paper)) else {
            continue;
        };
        for document in matches {
            rows.push(project(relation, document));
        }
    }
    rows
}

fn project(relation: &Relation, document: &Document) -> ResultRow {
    ResultRow {
        document_id: document.id,
        doi: document.doi.clone(),
        url: document.url.clone(),
        year: document.year,
        author: document.author.clone(),
        title: document.title.clone(),
        journal: document.journal.clone(),
        keyword_1: relation.pair.keyword_1.clone(),
        general_term_x: relation.terms_x.general_term.clone(),
        displayed_term_x: relation.terms_x.displayed_term.clone(),
        keyword_2: relation.pair.keyword_2.clone(),
        general_term_y: relation.terms_y.general_term.clone(),
        displayed_term_y: relation.terms_y.displayed_term.clone(),
        sentence: relation.pair.sentence.clone(),
        category: relation.category,
    }
}

/// Stable sort: newest year first, then title ascending. Missing values sort last.
pub fn sort_results(rows: &mut [ResultRow]) {
    rows.sort_by(|a, b| {
        none_last(a.year, b.year, |x, y| y.cmp(x))
            .then_with(|| none_last(a.title.as_ref(), b.title.as_ref(), |x, y| x.cmp(y)))
    });
}

fn none_last<T>(a: Option<T>, b: Option<T>, cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => cmp(&x, &y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
