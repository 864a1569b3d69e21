//! CLI entry-point for classifying one ad-hoc keyword pair.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    config::ModelSettings,
    nlp::relclf::{self, compose_input},
};

/// Args for the `classify` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Sentence containing both keywords.
    #[arg(long)]
    pub sentence: String,
    /// First keyword.
    #[arg(long)]
    pub first: String,
    /// Second keyword.
    #[arg(long)]
    pub second: String,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: ModelSettings) -> Result<()> {
    let classifier = relclf::load_classifier(&settings)?;
    let (first, second) = if args.first.to_lowercase() <= args.second.to_lowercase() {
        (args.first.to_lowercase(), args.second.to_lowercase())
    } else {
        (args.second.to_lowercase(), args.first.to_lowercase())
    };
    let input = compose_input(args.sentence.trim(), &first, &second);
    let labels = relclf::classify_in_batches(classifier.as_ref(), &[input], 1)?;
    let category = labels[0];
    info!(%category, classifier = classifier.name(), "classified pair");
    println!("{category}");
    Ok(())
}
