//! Attaches taxonomy terms to keyword pairs and removes self-relations.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    data::keywords::{KeywordSet, TermInfo},
    nlp::{pairs::KeywordPair, relclf::Category},
};

/// Keyword pair enriched with taxonomy terms for both sides, awaiting a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub pair: KeywordPair,
    /// Terms of `pair.keyword_1`.
    pub terms_x: TermInfo,
    /// Terms of `pair.keyword_2`.
    pub terms_y: TermInfo,
    pub category: Option<Category>,
}

impl Relation {
    /// Both sides map onto the same canonical term. A missing term never matches.
    pub fn is_self_relation(&self) -> bool {
        matches!(
            (&self.terms_x.normalized_term, &self.terms_y.normalized_term),
            (Some(x), Some(y)) if x == y
        )
    }
}

/// Left-join each side of every pair against the taxonomy, then drop self-relations.
pub fn attach_taxonomy(pairs: Vec<KeywordPair>, keywords: &KeywordSet) -> Vec<Relation> {
    let total = pairs.len();
    let relations: Vec<Relation> = pairs
        .into_iter()
        .map(|pair| Relation {
            terms_x: keywords.terms(&pair.keyword_1),
            terms_y: keywords.terms(&pair.keyword_2),
            pair,
            category: None,
        })
        .filter(|relation| !relation.is_self_relation())
        .collect();
    debug!(
        total,
        kept = relations.len(),
        "attached taxonomy terms"
    );
    relations
}
