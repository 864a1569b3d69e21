//! Keyword co-occurrence relation mining over a corpus of article texts.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod nlp;
pub mod pipeline;
