//! Data access layer: vocabulary, document metadata, store and export.

pub mod documents;
pub mod export;
pub mod keywords;
pub mod store;
