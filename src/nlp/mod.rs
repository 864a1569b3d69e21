//! Natural language processing layer: segmentation, pair extraction,
//! taxonomy enrichment and relation classification.

#[cfg(feature = "onx")]
pub mod bert;
pub mod pairs;
pub mod relclf;
pub mod segment;
pub mod taxonomy;

use tracing::info;

use crate::data::{documents::Document, keywords::KeywordSet};
use pairs::KeywordMatcher;
use segment::{Boundaries, MissingFiles};
use taxonomy::Relation;

/// Relation candidates for one page of documents.
#[derive(Debug, Default)]
pub struct PageRelations {
    pub relations: Vec<Relation>,
    pub missing: MissingFiles,
    pub skipped: usize,
}

/// Segment, scan and enrich a page of documents.
pub fn extract_relations(
    documents: &[Document],
    documents_root: &str,
    boundaries: &Boundaries,
    matcher: &KeywordMatcher,
    keywords: &KeywordSet,
) -> PageRelations {
    let extraction = pairs::extract_pairs(documents, documents_root, boundaries, matcher);
    let pair_count = extraction.pairs.len();
    let relations = taxonomy::attach_taxonomy(extraction.pairs, keywords);
    info!(
        documents = documents.len(),
        skipped = extraction.skipped,
        pairs = pair_count,
        relations = relations.len(),
        "extracted page relations"
    );
    PageRelations {
        relations,
        missing: extraction.missing,
        skipped: extraction.skipped,
    }
}
